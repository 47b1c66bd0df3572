use std::{mem, time::Duration, time::Instant};

use glam::Vec3;
use log::{debug, info, warn};
use uuid::Uuid;

use objsync_shared::{
    ExtraParam, ExtraParamType, FieldsPresent, GlobalId, InventoryItem, InventoryKey,
    InventorySerial, LocalId, ObjectFlags, PCode, PacketId, RawObjectBlock, RegionHandle,
    UpdateDecoder, UpdateDelta, UpdateKind, UpdateSource,
};

use crate::{
    circuit::CircuitStatus,
    config::SyncConfig,
    error::{RegistryError, SyncError},
    events::{ChangeFlags, SyncEvent, SyncEvents},
    inventory::{FetchId, FetchResponse, InventorySynchronizer},
    motion::{mark_authoritative, MotionExtrapolator},
    outbound::{CacheMissKind, OutboundRequest, Outbox},
    reconcile::{OrphanWaitlist, ParentReconciler, ReconcileOutcome},
    world::{Entity, EntityHandle, EntityRegistry, ExtraParamSlot, RegionInfo},
};

/// One inbound object update message, already split into blocks by the
/// message layer
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectUpdateMessage {
    pub kind: UpdateKind,
    pub region_handle: RegionHandle,
    /// Wire form of the region's time dilation, `v / 65535`
    pub time_dilation: u16,
    pub packet_id: PacketId,
    pub blocks: Vec<UpdateBlock>,
}

/// Per-entity payload of an `ObjectUpdateMessage`
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateBlock {
    Raw(RawObjectBlock),
    Packed {
        data: Vec<u8>,
        update_flags: Option<u32>,
    },
}

impl UpdateBlock {
    fn source(&self) -> UpdateSource<'_> {
        match self {
            UpdateBlock::Raw(block) => UpdateSource::Raw(block),
            UpdateBlock::Packed { data, update_flags } => UpdateSource::Packed {
                data,
                update_flags: *update_flags,
            },
        }
    }
}

/// What `process_update` did with a message
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateReport {
    pub applied: usize,
    pub dropped: usize,
    /// Every problem met on the way. None of them stopped other blocks.
    pub errors: Vec<SyncError>,
}

/// Owns the registry and drives every component of the sync engine from a
/// single thread
pub struct ObjectSyncEngine {
    // Config
    config: SyncConfig,
    // World
    registry: EntityRegistry,
    reconciler: ParentReconciler,
    extrapolator: MotionExtrapolator,
    inventory: InventorySynchronizer,
    // Output
    events: SyncEvents,
    outbox: Outbox,
    last_frame_dt: Duration,
}

impl ObjectSyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            reconciler: ParentReconciler::new(OrphanWaitlist::new(config.topology.orphan_ttl)),
            extrapolator: MotionExtrapolator::new(config.interpolation.clone()),
            inventory: InventorySynchronizer::new(config.inventory.clone()),
            registry: EntityRegistry::new(),
            events: SyncEvents::new(),
            outbox: Outbox::new(),
            last_frame_dt: Duration::ZERO,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn reconciler(&self) -> &ParentReconciler {
        &self.reconciler
    }

    pub fn inventory(&self) -> &InventorySynchronizer {
        &self.inventory
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.registry.get(handle)
    }

    pub fn entity_by_global_id(&self, global_id: &GlobalId) -> Option<&Entity> {
        self.registry
            .handle_of(global_id)
            .and_then(|handle| self.registry.get(handle))
    }

    // Regions

    pub fn add_region(&mut self, region: RegionInfo) {
        info!("Region {} added", region.handle);
        self.registry.regions_mut().insert(region);
    }

    /// Forgets a region and destroys every entity still in it
    pub fn remove_region(&mut self, region: RegionHandle) -> Result<(), SyncError> {
        if !self.registry.regions().contains(&region) {
            return Err(RegistryError::UnknownRegion { region }.into());
        }
        let doomed: Vec<EntityHandle> = self
            .registry
            .handles()
            .into_iter()
            .filter(|handle| {
                self.registry
                    .get(*handle)
                    .is_some_and(|entity| entity.region() == region)
            })
            .collect();
        for handle in doomed {
            // an earlier destroy may have taken it already
            if self.registry.contains(handle) {
                self.destroy(handle)?;
            }
        }
        self.registry.regions_mut().remove(&region);
        info!("Region {} removed", region);
        Ok(())
    }

    // Updates

    /// Applies every block of an inbound update message. A failing block
    /// never prevents the others from being applied.
    pub fn process_update(
        &mut self,
        message: &ObjectUpdateMessage,
        circuit: &dyn CircuitStatus,
        now: Instant,
    ) -> UpdateReport {
        let mut report = UpdateReport::default();
        let region = message.region_handle;
        let Some(region_info) = self.registry.regions_mut().get_mut(&region) else {
            warn!(
                "Dropping {} update blocks from unknown region {}",
                message.blocks.len(),
                region
            );
            report.dropped = message.blocks.len();
            report
                .errors
                .push(RegistryError::UnknownRegion { region }.into());
            return report;
        };
        region_info.set_time_dilation_wire(message.time_dilation);

        for block in &message.blocks {
            match self.apply_block(message, block, circuit, now, &mut report.errors) {
                Ok(true) => report.applied += 1,
                Ok(false) => report.dropped += 1,
                Err(err) => {
                    warn!("Dropping {:?} block in region {}: {}", message.kind, region, err);
                    report.dropped += 1;
                    report.errors.push(err);
                }
            }
        }
        report
    }

    /// Destroys the entity the simulator knows as `local_id`
    pub fn kill_object(&mut self, region: RegionHandle, local_id: LocalId) -> Result<(), SyncError> {
        let handle = self.registry.try_handle_of_local(region, local_id)?;
        self.destroy(handle)
    }

    /// Detaches the entity from its parent and children, abandons its
    /// inventory fetches and removes it from the registry.
    pub fn destroy(&mut self, handle: EntityHandle) -> Result<(), SyncError> {
        self.reconciler
            .unlink(&mut self.registry, handle, &mut self.events)?;
        let global_id = self.registry.try_get(handle)?.global_id();
        self.reconciler.forget_orphan(&global_id);
        self.inventory.abandon(handle);
        self.registry.destroy(handle)?;
        debug!("Destroyed {} ({})", global_id, handle);
        self.events.push(SyncEvent::Destroyed {
            entity: handle,
            global_id,
        });
        Ok(())
    }

    pub fn set_selected(&mut self, handle: EntityHandle, selected: bool) -> Result<(), SyncError> {
        self.registry.set_selected(handle, selected)?;
        Ok(())
    }

    // Outbound edits

    pub fn set_material(&mut self, handle: EntityHandle, material: u8) -> Result<(), SyncError> {
        let entity = self.registry.try_get_mut(handle)?;
        entity.material = material;
        self.outbox.push(OutboundRequest::MaterialUpdate {
            region: entity.region,
            local_id: entity.local_id,
            material,
        });
        Ok(())
    }

    /// Sends new object flags. Client-owned bits stay local.
    pub fn set_flags(&mut self, handle: EntityHandle, flags: ObjectFlags) -> Result<(), SyncError> {
        let entity = self.registry.try_get_mut(handle)?;
        entity.flags = flags;
        self.outbox.push(OutboundRequest::FlagsUpdate {
            region: entity.region,
            local_id: entity.local_id,
            flags: flags.difference(ObjectFlags::LOCAL),
        });
        Ok(())
    }

    /// Sets or clears (`param = None`) one extra parameter and sends the
    /// shape update.
    pub fn set_extra_param(
        &mut self,
        handle: EntityHandle,
        kind: ExtraParamType,
        param: Option<ExtraParam>,
    ) -> Result<(), SyncError> {
        let entity = self.registry.try_get_mut(handle)?;
        let in_use = param.is_some();
        match &param {
            Some(param) => {
                entity.extra_params.insert(
                    kind,
                    ExtraParamSlot {
                        param: param.clone(),
                        in_use: true,
                    },
                );
            }
            None => {
                if let Some(slot) = entity.extra_params.get_mut(&kind) {
                    slot.in_use = false;
                }
            }
        }
        self.outbox.push(OutboundRequest::ShapeUpdate {
            region: entity.region,
            local_id: entity.local_id,
            param_type: kind,
            param,
        });
        self.events.push(SyncEvent::ExtraParamChanged {
            entity: handle,
            kind,
            in_use,
        });
        self.events.push_changed(handle, extra_param_flags(kind));
        Ok(())
    }

    // Tick

    /// Runs once per frame after all inbound messages of the frame were
    /// processed.
    pub fn tick(&mut self, circuit: &dyn CircuitStatus, now: Instant, frame_dt: Duration) {
        self.last_frame_dt = frame_dt;
        self.extrapolator
            .tick(&mut self.registry, circuit, now, &mut self.events);
        self.inventory
            .poll(&mut self.registry, now, &mut self.outbox);
        let expired = self.reconciler.expire_orphans(&mut self.registry, now);
        if !expired.is_empty() {
            debug!("{} orphans gave up waiting for their parent", expired.len());
        }
    }

    // Inventory

    pub fn request_inventory(&mut self, handle: EntityHandle) -> Result<Option<FetchId>, SyncError> {
        self.inventory.request_inventory(
            &mut self.registry,
            handle,
            &mut self.outbox,
            &mut self.events,
        )
    }

    pub fn fetch_inventory(&mut self, handle: EntityHandle) -> Result<FetchId, SyncError> {
        self.inventory
            .fetch_inventory(&mut self.registry, handle, &mut self.outbox)
    }

    pub fn dirty_inventory(&mut self, handle: EntityHandle) -> Result<(), SyncError> {
        self.inventory.dirty_inventory(&mut self.registry, handle)
    }

    pub fn resume_fetch(
        &mut self,
        fetch: FetchId,
        response: FetchResponse,
        now: Instant,
    ) -> Result<(), SyncError> {
        self.inventory.resume(
            &mut self.registry,
            fetch,
            response,
            now,
            &mut self.outbox,
            &mut self.events,
        )
    }

    pub fn on_task_inventory_reply(
        &mut self,
        global_id: GlobalId,
        serial: InventorySerial,
        filename: String,
        now: Instant,
    ) -> Result<(), SyncError> {
        self.inventory.on_task_inventory_reply(
            &mut self.registry,
            global_id,
            serial,
            filename,
            now,
            &mut self.outbox,
            &mut self.events,
        )
    }

    pub fn update_inventory(
        &mut self,
        handle: EntityHandle,
        item: InventoryItem,
        key: InventoryKey,
        is_new: bool,
    ) -> Result<(), SyncError> {
        self.inventory.update_inventory(
            &mut self.registry,
            handle,
            item,
            key,
            is_new,
            &mut self.outbox,
            &mut self.events,
        )
    }

    pub fn remove_inventory(&mut self, handle: EntityHandle, item_id: Uuid) -> Result<(), SyncError> {
        self.inventory.remove_inventory(
            &mut self.registry,
            handle,
            item_id,
            &mut self.outbox,
            &mut self.events,
        )
    }

    pub fn move_inventory(
        &mut self,
        handle: EntityHandle,
        folder_id: Uuid,
        item_id: Uuid,
    ) -> Result<(), SyncError> {
        self.inventory.move_inventory(
            &mut self.registry,
            handle,
            folder_id,
            item_id,
            &mut self.outbox,
            &mut self.events,
        )
    }

    // Output

    pub fn events(&self) -> &SyncEvents {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut SyncEvents {
        &mut self.events
    }

    /// Returns all queued change notifications and resets the queue
    pub fn receive_events(&mut self) -> SyncEvents {
        mem::take(&mut self.events)
    }

    /// Returns every outbound request queued so far, cache misses first
    pub fn take_outbound(&mut self) -> Vec<OutboundRequest> {
        let mut requests = Vec::new();
        for (region, misses) in self.registry.drain_cache_misses() {
            for kind in [CacheMissKind::Full, CacheMissKind::Crc] {
                let local_ids: Vec<LocalId> = misses
                    .iter()
                    .filter(|(_, miss)| *miss == kind)
                    .map(|(local_id, _)| *local_id)
                    .collect();
                if !local_ids.is_empty() {
                    requests.push(OutboundRequest::RequestObjects {
                        region,
                        local_ids,
                        kind,
                    });
                }
            }
        }
        requests.extend(self.outbox.drain());
        requests
    }

    // Block application

    /// Returns whether the block was applied
    fn apply_block(
        &mut self,
        message: &ObjectUpdateMessage,
        block: &UpdateBlock,
        circuit: &dyn CircuitStatus,
        now: Instant,
        errors: &mut Vec<SyncError>,
    ) -> Result<bool, SyncError> {
        let region = message.region_handle;
        let bounds = self
            .registry
            .regions()
            .get(&region)
            .ok_or(RegistryError::UnknownRegion { region })?
            .bounds();
        let outcome = UpdateDecoder::decode(message.kind, block.source(), &bounds)?;
        errors.extend(outcome.errors.into_iter().map(SyncError::from));
        let delta = outcome.delta;

        // Identity
        let (handle, newly_bound) = match delta.full_id {
            Some(global_id) => self.resolve_full(&delta, global_id, region, now)?,
            None => match self.registry.handle_of_local(region, delta.local_id) {
                Some(handle) => (handle, false),
                None => {
                    debug!(
                        "Terse update for unknown local id {} in {}, requesting it",
                        delta.local_id, region
                    );
                    self.registry
                        .request_cache_miss(region, delta.local_id, CacheMissKind::Full);
                    return Ok(false);
                }
            },
        };
        if newly_bound {
            let cycles = self
                .reconciler
                .release_orphans(&mut self.registry, handle, &mut self.events)?;
            for cycle in cycles {
                self.break_cycle(cycle.child, cycle.parent)?;
            }
            if !self.registry.contains(handle) {
                return Ok(false);
            }
        }

        // Ordinal guard
        let entity = self.registry.try_get_mut(handle)?;
        if is_stale_packet(entity.last_packet_id, message.packet_id) {
            debug!(
                "Dropping packet {} for {}, already applied {:?}",
                message.packet_id, handle, entity.last_packet_id
            );
            return Ok(false);
        }
        entity.last_packet_id = Some(message.packet_id);

        let flags = apply_message_fields(entity, handle, &delta, &mut self.events);
        self.events.push_changed(handle, flags);

        // Topology
        if !delta.kind.is_terse() {
            if let Some(declared) = delta.declared_parent() {
                let outcome = self.reconciler.reconcile(
                    &mut self.registry,
                    handle,
                    declared,
                    now,
                    &mut self.events,
                )?;
                if let ReconcileOutcome::CycleDetected { parent } = outcome {
                    self.break_cycle(handle, parent)?;
                    return Ok(false);
                }
            }
        }

        self.apply_motion(handle, &delta, circuit, now)?;
        Ok(true)
    }

    /// Finds or creates the entity named by a full update and binds its
    /// local id. Returns whether the binding is new.
    fn resolve_full(
        &mut self,
        delta: &UpdateDelta,
        global_id: GlobalId,
        region: RegionHandle,
        now: Instant,
    ) -> Result<(EntityHandle, bool), SyncError> {
        let Some(handle) = self.registry.handle_of(&global_id) else {
            let pcode = delta.pcode.unwrap_or(PCode::Volume);
            let handle = self
                .registry
                .create(global_id, region, delta.local_id, pcode, now)?;
            self.events.push(SyncEvent::Created {
                entity: handle,
                global_id,
            });
            return Ok((handle, true));
        };

        let entity = self.registry.try_get(handle)?;
        let old_region = entity.region();
        let rebinding = old_region != region || entity.local_id() != delta.local_id;
        if old_region != region {
            self.hand_off(handle, old_region, region)?;
        }
        if rebinding {
            self.registry.bind_local_id(handle, region, delta.local_id)?;
        }
        Ok((handle, rebinding))
    }

    /// Moves an entity into the region an update arrived from
    fn hand_off(
        &mut self,
        handle: EntityHandle,
        from: RegionHandle,
        to: RegionHandle,
    ) -> Result<(), SyncError> {
        let regions = self.registry.regions();
        let shift = match (regions.get(&from), regions.get(&to)) {
            (Some(from_info), Some(to_info)) => (from_info.origin() - to_info.origin()).as_vec3(),
            _ => Vec3::ZERO,
        };

        let entity = self.registry.try_get_mut(handle)?;
        if entity.parent().is_none() {
            entity.transform.position += shift;
        }
        entity.region = to;
        entity.last_packet_id = None;
        entity.motion.region_cross_expire = None;
        info!(
            "{} handed off from region {} to {}",
            entity.global_id, from, to
        );
        self.events
            .push_changed(handle, ChangeFlags::SHIFTED | ChangeFlags::MOVED);
        self.inventory.reset(&mut self.registry, handle)
    }

    /// Kills both ends of a parent loop and asks the simulator to resend them
    fn break_cycle(&mut self, child: EntityHandle, parent: EntityHandle) -> Result<(), SyncError> {
        for handle in [child, parent] {
            let Some(entity) = self.registry.get(handle) else {
                continue;
            };
            let (region, local_id) = (entity.region(), entity.local_id());
            warn!(
                "Killing {} (local id {}) to break a parent cycle",
                entity.global_id(),
                local_id
            );
            self.registry
                .request_cache_miss(region, local_id, CacheMissKind::Full);
            self.destroy(handle)?;
        }
        Ok(())
    }

    fn apply_motion(
        &mut self,
        handle: EntityHandle,
        delta: &UpdateDelta,
        circuit: &dyn CircuitStatus,
        now: Instant,
    ) -> Result<(), SyncError> {
        let region = self.registry.try_get(handle)?.region();
        let time_dilation = self
            .registry
            .regions()
            .get(&region)
            .map_or(1.0, |info| info.time_dilation);
        let ping_offset = if self.config.interpolation.ping_interpolate {
            let lag = circuit.ping_delay(region) + self.last_frame_dt;
            0.5 * time_dilation * lag.as_secs_f32()
        } else {
            0.0
        };

        let entity = self.registry.try_get_mut(handle)?;
        let mut flags = ChangeFlags::empty();

        if let Some(scale) = delta.scale.filter(|scale| scale.is_finite()) {
            if scale != entity.transform.scale {
                entity.transform.scale = scale;
                flags |= ChangeFlags::SCALED | ChangeFlags::SILHOUETTE;
            }
        }
        if let Some(plane) = delta.collision_plane {
            entity.motion.collision_plane = Some(plane);
        }

        if delta.fields.intersects(FieldsPresent::MOTION) {
            let velocity = delta.velocity.unwrap_or(entity.transform.velocity);
            let acceleration = delta.acceleration.unwrap_or(entity.transform.acceleration);
            let position = delta.position.map(|position| {
                if entity.selected {
                    position
                } else {
                    position + velocity * ping_offset
                }
            });
            let finite = position.map_or(true, |position| position.is_finite())
                && velocity.is_finite()
                && acceleration.is_finite()
                && delta.angular_velocity.map_or(true, |omega| omega.is_finite())
                && delta.rotation.map_or(true, |rotation| rotation.is_finite());
            if !finite {
                warn!(
                    "Rejecting non-finite motion for {} (local id {})",
                    entity.global_id, entity.local_id
                );
                self.events.push(SyncEvent::InvalidUpdate {
                    entity: handle,
                    local_id: entity.local_id,
                });
                self.events.push_changed(handle, flags);
                return Ok(());
            }

            if let Some(position) = position {
                if position != entity.transform.position {
                    flags |= ChangeFlags::MOVED | ChangeFlags::SILHOUETTE;
                }
                entity.transform.position = position;
                entity.motion.region_cross_expire = None;
            }
            entity.transform.velocity = velocity;
            entity.transform.acceleration = acceleration;

            let old_angular_velocity = entity.transform.angular_velocity;
            if let Some(omega) = delta.angular_velocity {
                entity.transform.angular_velocity = omega;
                if !delta.kind.is_terse() && omega == Vec3::ZERO {
                    entity.motion.reset_spin();
                }
            }
            if let Some(rotation) = delta.rotation {
                flags |= MotionExtrapolator::apply_authoritative_rotation(
                    entity,
                    rotation,
                    old_angular_velocity,
                );
            }

            if delta.precision.is_some() {
                entity.motion.best_update_precision = delta.precision;
            }
            mark_authoritative(entity, now);
        }

        self.events.push_changed(handle, flags);
        Ok(())
    }
}

/// True when `packet_id` is not newer than the last ordinal applied.
/// Ordinals far below the last one are taken as a sequence restart.
fn is_stale_packet(last: Option<PacketId>, packet_id: PacketId) -> bool {
    let Some(last) = last else {
        return false;
    };
    packet_id == last || (packet_id < last && last - packet_id < 65536)
}

fn extra_param_flags(kind: ExtraParamType) -> ChangeFlags {
    match kind {
        ExtraParamType::Flexible | ExtraParamType::Sculpt | ExtraParamType::ExtendedMesh => {
            ChangeFlags::GEOMETRY
        }
        ExtraParamType::RenderMaterial => ChangeFlags::TEXTURE,
        ExtraParamType::Light | ExtraParamType::LightImage | ExtraParamType::ReflectionProbe => {
            ChangeFlags::empty()
        }
    }
}

/// Copies the message-level groups of `delta` onto the entity, queueing a
/// notification for every group whose value actually changed.
fn apply_message_fields(
    entity: &mut Entity,
    handle: EntityHandle,
    delta: &UpdateDelta,
    events: &mut SyncEvents,
) -> ChangeFlags {
    let mut flags = ChangeFlags::empty();

    if let Some(pcode) = delta.pcode {
        entity.pcode = pcode;
    }
    if let Some(state) = delta.state {
        entity.state = state;
    }
    if let Some(crc) = delta.crc {
        entity.crc = crc;
    }
    if let Some(owner_id) = delta.owner_id {
        entity.owner_id = owner_id;
    }
    if let Some(click_action) = delta.click_action {
        entity.click_action = click_action;
    }
    if let Some(material) = delta.material {
        entity.material = material;
    }
    if let Some(raw) = delta.update_flags {
        if let Some(merged) = entity.flags.merged_with_server(raw) {
            entity.flags = merged;
        }
    }

    if delta.has(FieldsPresent::SOUND) && entity.sound != delta.sound {
        entity.sound = delta.sound.clone();
        events.push(SyncEvent::SoundChanged { entity: handle });
    }
    if delta.has(FieldsPresent::TEXT) && entity.text != delta.text {
        entity.text = delta.text.clone();
        events.push(SyncEvent::TextChanged { entity: handle });
    }
    if delta.has(FieldsPresent::MEDIA_URL) && entity.media_url != delta.media_url {
        entity.media_url = delta.media_url.clone();
        events.push(SyncEvent::MediaUrlChanged { entity: handle });
    }
    if delta.has(FieldsPresent::NAME_VALUES) {
        entity.name_values = delta.name_values.clone();
    }
    if delta.has(FieldsPresent::GENERIC_DATA) {
        entity.generic_data = delta.generic_data.clone();
    }
    if delta.has(FieldsPresent::PARTICLES) {
        entity.particle_block = delta.particle_block.clone();
    }

    if delta.has(FieldsPresent::EXTRA_PARAMS) {
        for param in &delta.extra_params {
            let kind = param.param_type();
            let unchanged = entity
                .extra_params
                .get(&kind)
                .is_some_and(|slot| slot.in_use && slot.param == *param);
            if unchanged {
                continue;
            }
            entity.extra_params.insert(
                kind,
                ExtraParamSlot {
                    param: param.clone(),
                    in_use: true,
                },
            );
            events.push(SyncEvent::ExtraParamChanged {
                entity: handle,
                kind,
                in_use: true,
            });
            flags |= extra_param_flags(kind);
        }

        for kind in ExtraParamType::ALL {
            let sent = delta
                .extra_params
                .iter()
                .any(|param| param.param_type() == kind);
            let Some(slot) = entity.extra_params.get_mut(&kind) else {
                continue;
            };
            if sent || !slot.in_use {
                continue;
            }
            slot.in_use = false;
            events.push(SyncEvent::ExtraParamChanged {
                entity: handle,
                kind,
                in_use: false,
            });
            flags |= extra_param_flags(kind);
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use objsync_shared::ByteWriter;

    use super::*;
    use crate::circuit::IdealCircuit;

    const REGION: RegionHandle = RegionHandle::from_origin(256_000, 256_000);
    const EAST: RegionHandle = RegionHandle::from_origin(256_256, 256_000);

    fn engine() -> ObjectSyncEngine {
        let mut engine = ObjectSyncEngine::new(SyncConfig::default());
        engine.add_region(RegionInfo::new(REGION));
        engine
    }

    fn full_block(id: u128, local_id: LocalId, parent_id: LocalId, position: Vec3) -> UpdateBlock {
        let mut writer = ByteWriter::new();
        for value in [position, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO] {
            writer.write_vec3(value);
        }
        let mut block = RawObjectBlock::terse(local_id, 0, writer.to_bytes());
        block.full_id = Uuid::from_u128(id);
        block.pcode = 9;
        block.parent_id = parent_id;
        block.scale = Vec3::ONE;
        UpdateBlock::Raw(block)
    }

    fn message(region: RegionHandle, packet_id: PacketId, blocks: Vec<UpdateBlock>) -> ObjectUpdateMessage {
        ObjectUpdateMessage {
            kind: UpdateKind::Full,
            region_handle: region,
            time_dilation: u16::MAX,
            packet_id,
            blocks,
        }
    }

    #[test]
    fn full_update_creates_entity() {
        let mut engine = engine();
        let now = Instant::now();
        let report = engine.process_update(
            &message(REGION, 1, vec![full_block(1, 10, 0, Vec3::new(5.0, 6.0, 7.0))]),
            &IdealCircuit,
            now,
        );
        assert_eq!(report.applied, 1);
        assert!(report.errors.is_empty());

        let entity = engine.entity_by_global_id(&GlobalId::from_u128(1)).unwrap();
        assert_eq!(entity.local_id(), 10);
        assert_eq!(entity.position(), Vec3::new(5.0, 6.0, 7.0));
        assert!(entity.is_static());
        assert!(engine
            .events()
            .iter()
            .any(|event| matches!(event, SyncEvent::Created { .. })));
    }

    #[test]
    fn terse_update_for_unknown_entity_requests_it() {
        let mut engine = engine();
        let block = RawObjectBlock::terse(33, 0, vec![0; 32]);
        let report = engine.process_update(
            &ObjectUpdateMessage {
                kind: UpdateKind::TerseImproved,
                ..message(REGION, 1, vec![UpdateBlock::Raw(block)])
            },
            &IdealCircuit,
            Instant::now(),
        );
        assert_eq!(report.dropped, 1);
        assert_eq!(
            engine.take_outbound(),
            vec![OutboundRequest::RequestObjects {
                region: REGION,
                local_ids: vec![33],
                kind: CacheMissKind::Full,
            }]
        );
    }

    #[test]
    fn unknown_region_drops_every_block() {
        let mut engine = engine();
        let report = engine.process_update(
            &message(EAST, 1, vec![full_block(1, 10, 0, Vec3::ZERO)]),
            &IdealCircuit,
            Instant::now(),
        );
        assert_eq!(report.dropped, 1);
        assert_eq!(
            report.errors,
            vec![SyncError::from(RegistryError::UnknownRegion { region: EAST })]
        );
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn handoff_shifts_position_into_new_region() {
        let mut engine = engine();
        engine.add_region(RegionInfo::new(EAST));
        let now = Instant::now();
        engine.process_update(
            &message(REGION, 5, vec![full_block(1, 10, 0, Vec3::new(250.0, 8.0, 20.0))]),
            &IdealCircuit,
            now,
        );
        let report = engine.process_update(
            &message(EAST, 1, vec![full_block(1, 77, 0, Vec3::new(2.0, 8.0, 20.0))]),
            &IdealCircuit,
            now,
        );
        assert_eq!(report.applied, 1);

        let handle = engine
            .registry()
            .handle_of(&GlobalId::from_u128(1))
            .unwrap();
        let entity = engine.entity(handle).unwrap();
        assert_eq!(entity.region(), EAST);
        assert_eq!(entity.local_id(), 77);
        assert_eq!(entity.last_packet_id(), Some(1));
        assert_eq!(engine.registry().handle_of_local(REGION, 10), None);
        assert!(engine.events().iter().any(|event| matches!(
            event,
            SyncEvent::Changed { flags, .. } if flags.contains(ChangeFlags::SHIFTED)
        )));
    }

    #[test]
    fn kill_detaches_children() {
        let mut engine = engine();
        let now = Instant::now();
        engine.process_update(
            &message(
                REGION,
                1,
                vec![
                    full_block(1, 10, 0, Vec3::ZERO),
                    full_block(2, 11, 10, Vec3::X),
                ],
            ),
            &IdealCircuit,
            now,
        );
        let child = engine.registry().handle_of_local(REGION, 11).unwrap();
        assert!(engine.entity(child).unwrap().parent().is_some());

        engine.kill_object(REGION, 10).unwrap();
        assert_eq!(engine.registry().len(), 1);
        assert_eq!(engine.entity(child).unwrap().parent(), None);
        assert_eq!(
            engine.kill_object(REGION, 10),
            Err(SyncError::from(RegistryError::UnknownLocalId {
                region: REGION,
                local_id: 10,
            }))
        );
    }

    #[test]
    fn flags_update_keeps_local_bits_off_the_wire() {
        let mut engine = engine();
        engine.process_update(
            &message(REGION, 1, vec![full_block(1, 10, 0, Vec3::ZERO)]),
            &IdealCircuit,
            Instant::now(),
        );
        let handle = engine.registry().handle_of_local(REGION, 10).unwrap();
        engine
            .set_flags(handle, ObjectFlags::PHANTOM | ObjectFlags::ANIM_SOURCE)
            .unwrap();
        assert_eq!(
            engine.take_outbound(),
            vec![OutboundRequest::FlagsUpdate {
                region: REGION,
                local_id: 10,
                flags: ObjectFlags::PHANTOM,
            }]
        );
        assert!(engine
            .entity(handle)
            .unwrap()
            .flags()
            .contains(ObjectFlags::ANIM_SOURCE));
    }

    #[test]
    fn stale_ordinals() {
        assert!(!is_stale_packet(None, 0));
        assert!(is_stale_packet(Some(10), 10));
        assert!(is_stale_packet(Some(10), 9));
        assert!(!is_stale_packet(Some(10), 11));
        assert!(!is_stale_packet(Some(100_000), 1));
    }
}
