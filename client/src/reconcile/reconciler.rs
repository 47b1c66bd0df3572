use std::time::Instant;

use log::{debug, warn};

use objsync_shared::{GlobalId, LocalId};

use crate::{
    error::RegistryError,
    events::{ChangeFlags, SyncEvent, SyncEvents},
    reconcile::OrphanWaitlist,
    world::{EntityHandle, EntityRegistry, TopologyState},
};

/// What a parent declaration did to an entity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Unchanged,
    Attached {
        old_parent: Option<EntityHandle>,
        new_parent: EntityHandle,
    },
    Detached {
        old_parent: EntityHandle,
    },
    Orphaned {
        awaiting: LocalId,
    },
    /// Attaching would close a loop. Nothing was changed; the caller is
    /// expected to destroy both entities.
    CycleDetected {
        parent: EntityHandle,
    },
}

/// A cycle found while releasing orphans
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentCycle {
    pub child: EntityHandle,
    pub parent: EntityHandle,
}

/// Keeps parent/child links consistent with what full updates declare
pub struct ParentReconciler {
    orphans: OrphanWaitlist,
}

impl ParentReconciler {
    pub fn new(orphans: OrphanWaitlist) -> Self {
        Self { orphans }
    }

    pub fn orphans(&self) -> &OrphanWaitlist {
        &self.orphans
    }

    /// Applies a declared parent (`None` for "no parent") to `child`.
    pub fn reconcile(
        &mut self,
        registry: &mut EntityRegistry,
        child: EntityHandle,
        declared: Option<LocalId>,
        now: Instant,
        events: &mut SyncEvents,
    ) -> Result<ReconcileOutcome, RegistryError> {
        let entity = registry.try_get(child)?;
        let region = entity.region();
        let global_id = entity.global_id();
        let current = entity.topology();
        let is_avatar = entity.is_avatar();

        let Some(parent_local_id) = declared else {
            return match current {
                TopologyState::NoParent => Ok(ReconcileOutcome::Unchanged),
                TopologyState::Orphaned { .. } => {
                    self.orphans.remove_child(&global_id);
                    registry.try_get_mut(child)?.topology = TopologyState::NoParent;
                    Ok(ReconcileOutcome::Unchanged)
                }
                TopologyState::HasParent(old_parent) => {
                    let parent_region = registry.get(old_parent).map(|parent| parent.region());
                    if parent_region.is_some_and(|parent_region| parent_region != region) {
                        debug!(
                            "Keeping {} attached to {} across a region handoff",
                            child, old_parent
                        );
                        return Ok(ReconcileOutcome::Unchanged);
                    }
                    self.detach(registry, child, events)?;
                    Ok(ReconcileOutcome::Detached { old_parent })
                }
            };
        };

        let Some(parent) = registry.handle_of_local(region, parent_local_id) else {
            if is_avatar && matches!(current, TopologyState::HasParent(_)) {
                debug!(
                    "Avatar {} keeps its parent while local id {} is unknown",
                    child, parent_local_id
                );
                return Ok(ReconcileOutcome::Unchanged);
            }
            if current == (TopologyState::Orphaned { awaiting: parent_local_id }) {
                return Ok(ReconcileOutcome::Unchanged);
            }
            if matches!(current, TopologyState::HasParent(_)) {
                self.detach(registry, child, events)?;
            }
            self.orphans.queue((region, parent_local_id), global_id, now);
            registry.try_get_mut(child)?.topology = TopologyState::Orphaned {
                awaiting: parent_local_id,
            };
            events.push(SyncEvent::Orphaned {
                entity: child,
                awaiting: parent_local_id,
            });
            return Ok(ReconcileOutcome::Orphaned {
                awaiting: parent_local_id,
            });
        };

        if current == TopologyState::HasParent(parent) {
            return Ok(ReconcileOutcome::Unchanged);
        }
        if Self::would_cycle(registry, child, parent) {
            warn!(
                "Parenting {} ({}) to {} would create a cycle",
                global_id, child, parent
            );
            return Ok(ReconcileOutcome::CycleDetected { parent });
        }

        if matches!(current, TopologyState::Orphaned { .. }) {
            self.orphans.remove_child(&global_id);
        }
        let old_parent = self.attach(registry, child, parent, events)?;
        Ok(ReconcileOutcome::Attached {
            old_parent,
            new_parent: parent,
        })
    }

    /// Attaches every orphan that was waiting for `parent`. Orphans that
    /// would close a loop are reported instead of attached.
    pub fn release_orphans(
        &mut self,
        registry: &mut EntityRegistry,
        parent: EntityHandle,
        events: &mut SyncEvents,
    ) -> Result<Vec<ParentCycle>, RegistryError> {
        let entity = registry.try_get(parent)?;
        let key = (entity.region(), entity.local_id());
        let mut cycles = Vec::new();

        for child_id in self.orphans.take_children(key) {
            let Some(child) = registry.handle_of(&child_id) else {
                continue;
            };
            let Some(child_entity) = registry.get(child) else {
                continue;
            };
            if child_entity.topology() != (TopologyState::Orphaned { awaiting: key.1 })
                || child_entity.region() != key.0
            {
                continue;
            }
            if Self::would_cycle(registry, child, parent) {
                warn!("Released orphan {} would close a parent cycle", child_id);
                cycles.push(ParentCycle { child, parent });
                continue;
            }
            self.attach(registry, child, parent, events)?;
        }
        Ok(cycles)
    }

    /// Cuts every link to and from `handle` ahead of its destruction.
    /// Children are detached, not destroyed.
    pub fn unlink(
        &mut self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        events: &mut SyncEvents,
    ) -> Result<(), RegistryError> {
        let entity = registry.try_get(handle)?;
        let global_id = entity.global_id();
        let children = entity.children().to_vec();
        let topology = entity.topology();

        for child in children {
            if registry.get(child).and_then(|entity| entity.parent()) == Some(handle) {
                self.detach(registry, child, events)?;
            }
        }
        match topology {
            TopologyState::HasParent(_) => self.detach(registry, handle, events)?,
            TopologyState::Orphaned { .. } => {
                self.orphans.remove_child(&global_id);
            }
            TopologyState::NoParent => {}
        }
        registry.try_get_mut(handle)?.children.clear();
        Ok(())
    }

    /// Gives up on orphans that waited too long. They become roots.
    pub fn expire_orphans(&mut self, registry: &mut EntityRegistry, now: Instant) -> Vec<GlobalId> {
        let expired = self.orphans.expire(now);
        for global_id in &expired {
            let Some(entity) = registry
                .handle_of(global_id)
                .and_then(|handle| registry.get_mut(handle))
            else {
                continue;
            };
            if entity.is_orphaned() {
                entity.topology = TopologyState::NoParent;
            }
        }
        expired
    }

    /// Forgets a child waiting for its parent. Used when the child dies.
    pub fn forget_orphan(&mut self, global_id: &GlobalId) {
        self.orphans.remove_child(global_id);
    }

    /// True when `parent` is `child` or descends from it. A chain longer
    /// than the registry is corrupt and counts as a cycle.
    pub fn would_cycle(registry: &EntityRegistry, child: EntityHandle, parent: EntityHandle) -> bool {
        let mut current = Some(parent);
        for _ in 0..=registry.len() {
            let Some(handle) = current else {
                return false;
            };
            if handle == child {
                return true;
            }
            current = registry.get(handle).and_then(|entity| entity.parent());
        }
        true
    }

    fn attach(
        &mut self,
        registry: &mut EntityRegistry,
        child: EntityHandle,
        parent: EntityHandle,
        events: &mut SyncEvents,
    ) -> Result<Option<EntityHandle>, RegistryError> {
        let old_parent = registry.try_get(child)?.parent();
        if old_parent.is_some() {
            self.detach(registry, child, events)?;
        }
        registry.try_get_mut(parent)?.add_child(child);
        registry.try_get_mut(child)?.topology = TopologyState::HasParent(parent);

        events.push(SyncEvent::TopologyChanged {
            entity: child,
            old_parent: None,
            new_parent: Some(parent),
        });
        let flags = ChangeFlags::MOVED | ChangeFlags::SILHOUETTE;
        events.push_changed(child, flags);
        if let Some(root) = registry.edit_root(parent) {
            events.push_changed(root, flags);
        }
        Ok(old_parent)
    }

    fn detach(
        &mut self,
        registry: &mut EntityRegistry,
        child: EntityHandle,
        events: &mut SyncEvents,
    ) -> Result<(), RegistryError> {
        let Some(old_parent) = registry.try_get(child)?.parent() else {
            return Ok(());
        };
        let old_root = registry.edit_root(old_parent);
        if let Some(parent) = registry.get_mut(old_parent) {
            parent.remove_child(child);
        }
        registry.try_get_mut(child)?.topology = TopologyState::NoParent;

        events.push(SyncEvent::TopologyChanged {
            entity: child,
            old_parent: Some(old_parent),
            new_parent: None,
        });
        let flags = ChangeFlags::MOVED | ChangeFlags::SILHOUETTE;
        events.push_changed(child, flags);
        if let Some(root) = old_root {
            events.push_changed(root, flags);
        }
        Ok(())
    }
}
