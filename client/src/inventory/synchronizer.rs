use std::{collections::HashMap, time::Instant};

use log::{debug, info, warn};
use uuid::Uuid;

use objsync_shared::{
    inventory::parse_task_inventory, GlobalId, InventoryItem, InventoryKey, InventorySerial,
};

use crate::{
    config::InventoryConfig,
    error::{InventoryError, RegistryError, SyncError},
    events::{SyncEvent, SyncEvents},
    inventory::{
        fetch::{FetchStage, FetchTask},
        FetchId, FetchResponse, InventoryCache, InventoryState, PendingRequest,
    },
    outbound::{OutboundRequest, Outbox},
    world::{Entity, EntityHandle, EntityRegistry},
};

enum Listing {
    Contents(Vec<InventoryItem>),
    Transfer { filename: String },
}

/// Keeps each entity's content listing coherent with the simulator's
/// serial. Fetches are suspended tasks resumed by `resume` and woken by
/// `poll`, all on the caller's thread.
pub struct InventorySynchronizer {
    config: InventoryConfig,
    tasks: HashMap<FetchId, FetchTask>,
    next_fetch: u64,
}

impl InventorySynchronizer {
    pub fn new(config: InventoryConfig) -> Self {
        Self {
            config,
            tasks: HashMap::new(),
            next_fetch: 0,
        }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Number of fetches that are suspended or delayed
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Request a live fetch is suspended on, if any
    pub fn pending_request(&self, fetch: FetchId) -> Option<&PendingRequest> {
        let task = self.tasks.get(&fetch)?;
        match &task.stage {
            FetchStage::Suspended(request) if !task.superseded => Some(request),
            _ => None,
        }
    }

    /// When a delayed retry will wake, if `fetch` is one
    pub fn retry_at(&self, fetch: FetchId) -> Option<Instant> {
        match self.tasks.get(&fetch)?.stage {
            FetchStage::Delayed { wake_at } => Some(wake_at),
            FetchStage::Suspended(_) => None,
        }
    }

    /// Serves the cached listing when it is clean, otherwise makes sure a
    /// fetch is running. Returns the fetch the listing will arrive through.
    pub fn request_inventory(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        outbox: &mut Outbox,
        events: &mut SyncEvents,
    ) -> Result<Option<FetchId>, SyncError> {
        let cache = &registry.try_get(handle)?.inventory;
        if let Some(contents) = cache.contents.as_ref().filter(|_| !cache.dirty) {
            events.push(SyncEvent::InventoryChanged {
                entity: handle,
                serial: cache.serial,
                contents: contents.clone(),
            });
            return Ok(None);
        }
        if cache.is_pending() {
            return Ok(cache.active_fetch);
        }
        self.fetch_inventory(registry, handle, outbox).map(Some)
    }

    /// Starts a fresh fetch, superseding any fetch already running.
    pub fn fetch_inventory(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        outbox: &mut Outbox,
    ) -> Result<FetchId, SyncError> {
        let entity = registry.try_get(handle)?;
        let has_capability = registry
            .regions()
            .get(&entity.region())
            .ok_or(RegistryError::UnknownRegion {
                region: entity.region(),
            })?
            .has_task_inventory_capability;

        let fetch = self.next_fetch_id();
        let entity = registry.try_get_mut(handle)?;
        self.supersede(&mut entity.inventory, outbox);

        let request = if has_capability {
            let known_serial = entity
                .inventory
                .contents
                .is_some()
                .then_some(entity.inventory.serial);
            outbox.push(OutboundRequest::FetchInventory {
                fetch,
                entity: entity.global_id,
                known_serial,
            });
            entity.inventory.state = InventoryState::HttpFetch;
            PendingRequest::Http { known_serial }
        } else {
            outbox.push(OutboundRequest::RequestTaskInventory {
                fetch,
                region: entity.region,
                local_id: entity.local_id,
            });
            entity.inventory.state = InventoryState::Pending;
            PendingRequest::TaskInventory
        };
        debug!(
            "Fetching inventory of {} as {} ({})",
            entity.global_id,
            fetch,
            request.name()
        );
        entity.inventory.active_fetch = Some(fetch);
        self.tasks.insert(
            fetch,
            FetchTask {
                entity: handle,
                global_id: entity.global_id,
                stage: FetchStage::Suspended(request),
                superseded: false,
            },
        );
        Ok(fetch)
    }

    /// Marks the cached listing for refresh on the next request.
    pub fn dirty_inventory(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
    ) -> Result<(), SyncError> {
        registry.try_get_mut(handle)?.inventory.dirty = true;
        Ok(())
    }

    /// Resumes the fetch suspended on `fetch` with the transport's reply.
    pub fn resume(
        &mut self,
        registry: &mut EntityRegistry,
        fetch: FetchId,
        response: FetchResponse,
        now: Instant,
        outbox: &mut Outbox,
        events: &mut SyncEvents,
    ) -> Result<(), SyncError> {
        let task = self
            .tasks
            .remove(&fetch)
            .ok_or(InventoryError::UnknownFetch { fetch })?;
        let Some(entity) = Self::task_entity(registry, &task) else {
            warn!(
                "Discarding {} for inventory fetch {}: {} is gone",
                response.name(),
                fetch,
                task.global_id
            );
            return Err(InventoryError::EntityGone {
                global_id: task.global_id,
            }
            .into());
        };
        if task.superseded || entity.inventory.active_fetch != Some(fetch) {
            debug!("Discarding {} for superseded fetch {}", response.name(), fetch);
            return Err(InventoryError::Superseded { fetch }.into());
        }
        let FetchStage::Suspended(request) = task.stage.clone() else {
            let received = response.name();
            self.tasks.insert(fetch, task);
            return Err(InventoryError::UnexpectedResponse {
                fetch,
                expected: "retry delay",
                received,
            }
            .into());
        };

        let handle = task.entity;
        let global_id = task.global_id;
        let cache = &mut entity.inventory;
        match (request, response) {
            (PendingRequest::Http { .. }, FetchResponse::HttpContents { serial, items }) => {
                self.apply_listing(
                    handle,
                    global_id,
                    cache,
                    fetch,
                    serial,
                    Listing::Contents(items),
                    now,
                    outbox,
                    events,
                );
                Ok(())
            }
            (PendingRequest::Http { .. }, FetchResponse::HttpNotModified) => {
                match cache.contents.clone() {
                    Some(contents) if !cache.serial.is_older_than(cache.expected_serial) => {
                        Self::finish(handle, cache, contents, events);
                    }
                    _ => {
                        let wake_at = now + self.config.outdated_retry_delay;
                        self.schedule_retry(handle, global_id, cache, wake_at);
                    }
                }
                Ok(())
            }
            (PendingRequest::Http { .. }, FetchResponse::HttpFailed { reason })
            | (PendingRequest::Xfer { .. }, FetchResponse::XferFailed { reason }) => {
                warn!("Inventory fetch for {} failed: {}", global_id, reason);
                cache.stop();
                events.push(SyncEvent::InventoryFetchFailed {
                    entity: handle,
                    reason,
                });
                Ok(())
            }
            (PendingRequest::Xfer { serial, .. }, FetchResponse::XferComplete { data }) => {
                let text = String::from_utf8_lossy(&data);
                let items = match parse_task_inventory(&text) {
                    Ok(items) => items,
                    Err(err) => {
                        let err = InventoryError::MalformedListing {
                            global_id,
                            reason: err.to_string(),
                        };
                        warn!("{}", err);
                        cache.stop();
                        events.push(SyncEvent::InventoryFetchFailed {
                            entity: handle,
                            reason: err.to_string(),
                        });
                        return Err(err.into());
                    }
                };
                if serial.is_older_than(cache.serial) {
                    debug!(
                        "Ignoring listing {} for {}, already at {}",
                        serial, global_id, cache.serial
                    );
                    cache.stop();
                    return Ok(());
                }
                let contents = with_contents_root(global_id, items);
                Self::finish(handle, cache, contents, events);
                info!("Loaded inventory {} of {}", cache.serial, global_id);
                Ok(())
            }
            (request, response) => {
                let expected = request.name();
                let received = response.name();
                self.tasks.insert(
                    fetch,
                    FetchTask {
                        entity: handle,
                        global_id,
                        stage: FetchStage::Suspended(request),
                        superseded: false,
                    },
                );
                Err(InventoryError::UnexpectedResponse {
                    fetch,
                    expected,
                    received,
                }
                .into())
            }
        }
    }

    /// Handles the simulator's answer to a task inventory request, or its
    /// unsolicited notice that the listing changed.
    #[allow(clippy::too_many_arguments)]
    pub fn on_task_inventory_reply(
        &mut self,
        registry: &mut EntityRegistry,
        global_id: GlobalId,
        serial: InventorySerial,
        filename: String,
        now: Instant,
        outbox: &mut Outbox,
        events: &mut SyncEvents,
    ) -> Result<(), SyncError> {
        let handle = registry
            .handle_of(&global_id)
            .ok_or(RegistryError::UnknownGlobalId { global_id })?;
        let region = registry.try_get(handle)?.region();
        let has_capability = registry
            .regions()
            .get(&region)
            .is_some_and(|region| region.has_task_inventory_capability);

        if has_capability {
            let cache = &mut registry.try_get_mut(handle)?.inventory;
            cache.expected_serial = cache.expected_serial.max(serial);
            info!(
                "Inventory of {} changed to {}, refetching",
                global_id, cache.expected_serial
            );
            self.fetch_inventory(registry, handle, outbox)?;
            return Ok(());
        }

        let entity = registry.try_get_mut(handle)?;
        let waiting = entity.inventory.active_fetch.filter(|fetch| {
            self.tasks.get(fetch).is_some_and(|task| {
                !task.superseded
                    && task.stage == FetchStage::Suspended(PendingRequest::TaskInventory)
            })
        });
        let fetch = match waiting {
            Some(fetch) => {
                self.tasks.remove(&fetch);
                fetch
            }
            None => {
                self.supersede(&mut entity.inventory, outbox);
                self.next_fetch_id()
            }
        };
        entity.inventory.active_fetch = Some(fetch);
        self.apply_listing(
            handle,
            global_id,
            &mut entity.inventory,
            fetch,
            serial,
            Listing::Transfer { filename },
            now,
            outbox,
            events,
        );
        Ok(())
    }

    /// Drops superseded fetches, then wakes delayed retries that are due
    /// and starts their fetches. A reply for a dropped fetch is unknown.
    pub fn poll(
        &mut self,
        registry: &mut EntityRegistry,
        now: Instant,
        outbox: &mut Outbox,
    ) -> Vec<FetchId> {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !task.superseded);
        let swept = before - self.tasks.len();
        if swept > 0 {
            debug!("Dropped {} superseded inventory fetches", swept);
        }

        let mut due: Vec<FetchId> = self
            .tasks
            .iter()
            .filter(|(_, task)| {
                matches!(task.stage, FetchStage::Delayed { wake_at } if wake_at <= now)
            })
            .map(|(fetch, _)| *fetch)
            .collect();
        due.sort();

        let mut started = Vec::new();
        for fetch in due {
            let Some(task) = self.tasks.remove(&fetch) else {
                continue;
            };
            let Some(entity) = Self::task_entity(registry, &task) else {
                debug!("Dropping retry {} for vanished {}", fetch, task.global_id);
                continue;
            };
            if task.superseded || entity.inventory.active_fetch != Some(fetch) {
                continue;
            }
            entity.inventory.stop();
            match self.fetch_inventory(registry, task.entity, outbox) {
                Ok(started_fetch) => started.push(started_fetch),
                Err(err) => warn!("Retrying inventory of {} failed: {}", task.global_id, err),
            }
        }
        started
    }

    /// Sends an edited or new item and bumps the expected serial.
    #[allow(clippy::too_many_arguments)]
    pub fn update_inventory(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        item: InventoryItem,
        key: InventoryKey,
        is_new: bool,
        outbox: &mut Outbox,
        events: &mut SyncEvents,
    ) -> Result<(), SyncError> {
        let entity = registry.try_get_mut(handle)?;
        outbox.push(OutboundRequest::UpdateInventory {
            region: entity.region,
            local_id: entity.local_id,
            item: item.clone(),
            key,
        });
        let cache = &mut entity.inventory;
        if !is_new {
            if let Some(contents) = cache.contents.as_mut() {
                contents.retain(|existing| existing.item_id != item.item_id);
                contents.push(item);
                events.push(SyncEvent::InventoryChanged {
                    entity: handle,
                    serial: cache.serial,
                    contents: contents.clone(),
                });
            }
        }
        cache.bump_expected();
        Ok(())
    }

    /// Sends a removal and drops the item locally.
    pub fn remove_inventory(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        item_id: Uuid,
        outbox: &mut Outbox,
        events: &mut SyncEvents,
    ) -> Result<(), SyncError> {
        let entity = registry.try_get_mut(handle)?;
        outbox.push(OutboundRequest::RemoveInventory {
            region: entity.region,
            local_id: entity.local_id,
            item_id,
        });
        Self::delete_item(handle, &mut entity.inventory, item_id, events);
        entity.inventory.bump_expected();
        Ok(())
    }

    /// Moves an item into the agent's folder. Only items that cannot be
    /// copied leave the entity, so only those change its serial.
    pub fn move_inventory(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        folder_id: Uuid,
        item_id: Uuid,
        outbox: &mut Outbox,
        events: &mut SyncEvents,
    ) -> Result<(), SyncError> {
        let entity = registry.try_get_mut(handle)?;
        outbox.push(OutboundRequest::MoveInventory {
            region: entity.region,
            local_id: entity.local_id,
            folder_id,
            item_id,
        });
        let leaves = entity
            .inventory
            .contents
            .as_ref()
            .and_then(|contents| contents.iter().find(|item| item.item_id == item_id))
            .is_some_and(|item| !item.is_copyable());
        if leaves {
            Self::delete_item(handle, &mut entity.inventory, item_id, events);
            entity.inventory.bump_expected();
        }
        Ok(())
    }

    /// Drops every fetch of a destroyed entity. Transport requests already
    /// sent are left alone; their replies will find no task.
    pub fn abandon(&mut self, handle: EntityHandle) {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| task.entity != handle);
        let dropped = before - self.tasks.len();
        if dropped > 0 {
            debug!("Abandoned {} inventory fetches of {}", dropped, handle);
        }
    }

    /// Forgets all inventory bookkeeping of an entity that changed region
    pub fn reset(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
    ) -> Result<(), SyncError> {
        self.abandon(handle);
        registry.try_get_mut(handle)?.inventory.reset();
        Ok(())
    }

    fn next_fetch_id(&mut self) -> FetchId {
        self.next_fetch += 1;
        FetchId::new(self.next_fetch)
    }

    fn task_entity<'r>(
        registry: &'r mut EntityRegistry,
        task: &FetchTask,
    ) -> Option<&'r mut Entity> {
        registry
            .get_mut(task.entity)
            .filter(|entity| entity.global_id == task.global_id)
    }

    /// Invalidates the fetch currently running for this cache. A transfer
    /// in flight is aborted.
    fn supersede(&mut self, cache: &mut InventoryCache, outbox: &mut Outbox) {
        let Some(old) = cache.active_fetch.take() else {
            return;
        };
        let Some(task) = self.tasks.get_mut(&old) else {
            return;
        };
        if let FetchStage::Suspended(request) = &task.stage {
            if !matches!(request, PendingRequest::Xfer { .. }) {
                task.superseded = true;
                debug!("Inventory fetch {} superseded", old);
                return;
            }
            outbox.push(OutboundRequest::AbortXfer { fetch: old });
        }
        self.tasks.remove(&old);
        debug!("Inventory fetch {} superseded", old);
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_listing(
        &mut self,
        handle: EntityHandle,
        global_id: GlobalId,
        cache: &mut InventoryCache,
        fetch: FetchId,
        serial: InventorySerial,
        listing: Listing,
        now: Instant,
        outbox: &mut Outbox,
        events: &mut SyncEvents,
    ) {
        if serial.is_older_than(cache.expected_serial) {
            cache.stale_retries += 1;
            let exhausted = self
                .config
                .max_stale_retries
                .is_some_and(|max| cache.stale_retries > max);
            if !exhausted {
                let delay = if serial == cache.serial {
                    warn!(
                        "Inventory of {} is stuck at {} while {} is expected",
                        global_id, serial, cache.expected_serial
                    );
                    events.push(SyncEvent::InventoryDesync {
                        entity: handle,
                        server_serial: serial,
                        expected: cache.expected_serial,
                    });
                    self.config.desync_retry_delay
                } else {
                    debug!(
                        "Inventory {} of {} is older than expected {}",
                        serial, global_id, cache.expected_serial
                    );
                    cache.serial = cache.serial.max(serial);
                    self.config.outdated_retry_delay
                };
                self.schedule_retry(handle, global_id, cache, now + delay);
                return;
            }

            let err = InventoryError::RetriesExhausted {
                global_id,
                expected: cache.expected_serial.value(),
                retries: cache.stale_retries,
            };
            warn!("{}", err);
            events.push(SyncEvent::InventoryFetchFailed {
                entity: handle,
                reason: err.to_string(),
            });
            cache.serial = cache.serial.max(serial);
            cache.expected_serial = cache.serial;
        } else {
            cache.serial = serial;
            cache.expected_serial = serial;
        }
        cache.stale_retries = 0;

        match listing {
            Listing::Contents(items) => {
                let contents = with_contents_root(global_id, items);
                Self::finish(handle, cache, contents, events);
                info!("Loaded inventory {} of {}", cache.serial, global_id);
            }
            Listing::Transfer { filename } if filename.is_empty() => {
                Self::finish(handle, cache, vec![InventoryItem::contents_root(global_id)], events);
            }
            Listing::Transfer { filename } => {
                outbox.push(OutboundRequest::RequestXfer {
                    fetch,
                    filename: filename.clone(),
                });
                cache.state = InventoryState::Xfer;
                cache.active_fetch = Some(fetch);
                self.tasks.insert(
                    fetch,
                    FetchTask {
                        entity: handle,
                        global_id,
                        stage: FetchStage::Suspended(PendingRequest::Xfer {
                            filename,
                            serial: cache.serial,
                        }),
                        superseded: false,
                    },
                );
            }
        }
    }

    fn schedule_retry(
        &mut self,
        handle: EntityHandle,
        global_id: GlobalId,
        cache: &mut InventoryCache,
        wake_at: Instant,
    ) {
        let fetch = self.next_fetch_id();
        cache.state = InventoryState::Waiting;
        cache.active_fetch = Some(fetch);
        self.tasks.insert(
            fetch,
            FetchTask {
                entity: handle,
                global_id,
                stage: FetchStage::Delayed { wake_at },
                superseded: false,
            },
        );
    }

    fn finish(
        handle: EntityHandle,
        cache: &mut InventoryCache,
        contents: Vec<InventoryItem>,
        events: &mut SyncEvents,
    ) {
        cache.finish(contents.clone());
        events.push(SyncEvent::InventoryChanged {
            entity: handle,
            serial: cache.serial,
            contents,
        });
    }

    fn delete_item(
        handle: EntityHandle,
        cache: &mut InventoryCache,
        item_id: Uuid,
        events: &mut SyncEvents,
    ) {
        let Some(contents) = cache.contents.as_mut() else {
            return;
        };
        let before = contents.len();
        contents.retain(|item| item.item_id != item_id);
        if contents.len() != before {
            events.push(SyncEvent::InventoryChanged {
                entity: handle,
                serial: cache.serial,
                contents: contents.clone(),
            });
        }
    }
}

/// Prefixes a listing with the root category named after the entity,
/// unless it already carries one.
fn with_contents_root(owner: GlobalId, mut items: Vec<InventoryItem>) -> Vec<InventoryItem> {
    let has_root = items
        .iter()
        .any(|item| item.is_category() && item.item_id == owner.uuid());
    if !has_root {
        items.insert(0, InventoryItem::contents_root(owner));
    }
    items
}
