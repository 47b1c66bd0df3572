use std::{collections::HashMap, time::Instant};

use glam::{Quat, Vec3, Vec4};
use uuid::Uuid;

use objsync_shared::{
    AttachedSound, ExtraParam, ExtraParamType, GlobalId, LocalId, NameValue, ObjectFlags,
    PCode, PacketId, RegionHandle, TextLabel, UpdatePrecision,
};

use crate::{inventory::InventoryCache, world::EntityHandle};

/// Squared magnitude below which a derivative counts as zero
pub const STATIC_EPSILON_SQUARED: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Relative to the parent, or to the region origin for roots
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub rotation: Quat,
    pub angular_velocity: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn is_static(&self) -> bool {
        self.velocity.length_squared() <= STATIC_EPSILON_SQUARED
            && self.acceleration.length_squared() <= STATIC_EPSILON_SQUARED
            && self.angular_velocity.length_squared() <= STATIC_EPSILON_SQUARED
    }

    pub fn has_angular_velocity(&self) -> bool {
        self.angular_velocity.length_squared() > STATIC_EPSILON_SQUARED
    }
}

/// Dead-reckoning bookkeeping
#[derive(Clone, Copy, Debug)]
pub struct MotionState {
    /// Last authoritative rotation, before accumulated spin
    pub previous_rotation: Quat,
    /// Spin integrated since the last authoritative rotation
    pub accumulated_spin: Quat,
    pub rotation_time: f32,
    pub static_flag: bool,
    pub best_update_precision: Option<UpdatePrecision>,
    pub last_message_update: Instant,
    pub last_interpolation_update: Instant,
    /// Set while a prediction sits across the region edge
    pub region_cross_expire: Option<Instant>,
    pub collision_plane: Option<Vec4>,
}

impl MotionState {
    pub fn new(now: Instant) -> Self {
        Self {
            previous_rotation: Quat::IDENTITY,
            accumulated_spin: Quat::IDENTITY,
            rotation_time: 0.0,
            static_flag: true,
            best_update_precision: None,
            last_message_update: now,
            last_interpolation_update: now,
            region_cross_expire: None,
            collision_plane: None,
        }
    }

    pub fn reset_spin(&mut self) {
        self.accumulated_spin = Quat::IDENTITY;
        self.rotation_time = 0.0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyState {
    NoParent,
    HasParent(EntityHandle),
    /// Declared parent has not been seen in the region yet
    Orphaned { awaiting: LocalId },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtraParamSlot {
    pub param: ExtraParam,
    pub in_use: bool,
}

/// One simulated object
#[derive(Debug)]
pub struct Entity {
    pub(crate) global_id: GlobalId,
    pub(crate) local_id: LocalId,
    pub(crate) region: RegionHandle,
    pub(crate) pcode: PCode,
    pub(crate) transform: Transform,
    pub(crate) motion: MotionState,
    pub(crate) topology: TopologyState,
    pub(crate) children: Vec<EntityHandle>,
    pub(crate) last_packet_id: Option<PacketId>,
    pub(crate) flags: ObjectFlags,
    pub(crate) state: u8,
    pub(crate) crc: u32,
    pub(crate) material: u8,
    pub(crate) click_action: u8,
    pub(crate) owner_id: Uuid,
    pub(crate) sound: Option<AttachedSound>,
    pub(crate) text: Option<TextLabel>,
    pub(crate) media_url: Option<String>,
    pub(crate) name_values: Vec<NameValue>,
    pub(crate) extra_params: HashMap<ExtraParamType, ExtraParamSlot>,
    pub(crate) generic_data: Option<Vec<u8>>,
    pub(crate) particle_block: Option<Vec<u8>>,
    pub(crate) selected: bool,
    pub(crate) inventory: InventoryCache,
}

impl Entity {
    pub(crate) fn new(
        global_id: GlobalId,
        region: RegionHandle,
        local_id: LocalId,
        pcode: PCode,
        now: Instant,
    ) -> Self {
        Self {
            global_id,
            local_id,
            region,
            pcode,
            transform: Transform::default(),
            motion: MotionState::new(now),
            topology: TopologyState::NoParent,
            children: Vec::new(),
            last_packet_id: None,
            flags: ObjectFlags::empty(),
            state: 0,
            crc: 0,
            material: 0,
            click_action: 0,
            owner_id: Uuid::nil(),
            sound: None,
            text: None,
            media_url: None,
            name_values: Vec::new(),
            extra_params: HashMap::new(),
            generic_data: None,
            particle_block: None,
            selected: false,
            inventory: InventoryCache::new(),
        }
    }

    pub fn global_id(&self) -> GlobalId {
        self.global_id
    }

    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn region(&self) -> RegionHandle {
        self.region
    }

    pub fn pcode(&self) -> PCode {
        self.pcode
    }

    pub fn is_avatar(&self) -> bool {
        self.pcode.is_avatar()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.transform.velocity
    }

    pub fn acceleration(&self) -> Vec3 {
        self.transform.acceleration
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.transform.angular_velocity
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    pub fn is_static(&self) -> bool {
        self.motion.static_flag
    }

    pub fn topology(&self) -> TopologyState {
        self.topology
    }

    pub fn parent(&self) -> Option<EntityHandle> {
        match self.topology {
            TopologyState::HasParent(parent) => Some(parent),
            _ => None,
        }
    }

    pub fn is_orphaned(&self) -> bool {
        matches!(self.topology, TopologyState::Orphaned { .. })
    }

    pub fn children(&self) -> &[EntityHandle] {
        &self.children
    }

    pub fn last_packet_id(&self) -> Option<PacketId> {
        self.last_packet_id
    }

    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    pub fn state(&self) -> u8 {
        self.state
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn material(&self) -> u8 {
        self.material
    }

    pub fn click_action(&self) -> u8 {
        self.click_action
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn sound(&self) -> Option<&AttachedSound> {
        self.sound.as_ref()
    }

    pub fn text(&self) -> Option<&TextLabel> {
        self.text.as_ref()
    }

    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }

    pub fn name_values(&self) -> &[NameValue] {
        &self.name_values
    }

    pub fn name_value(&self, name: &str) -> Option<&NameValue> {
        self.name_values.iter().find(|entry| entry.name == name)
    }

    /// Parameter of this type, if the entity currently uses it
    pub fn extra_param(&self, kind: ExtraParamType) -> Option<&ExtraParam> {
        self.extra_params
            .get(&kind)
            .filter(|slot| slot.in_use)
            .map(|slot| &slot.param)
    }

    pub fn generic_data(&self) -> Option<&[u8]> {
        self.generic_data.as_deref()
    }

    pub fn particle_block(&self) -> Option<&[u8]> {
        self.particle_block.as_deref()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn inventory(&self) -> &InventoryCache {
        &self.inventory
    }

    pub(crate) fn update_static_flag(&mut self) {
        self.motion.static_flag = self.transform.is_static();
    }

    pub(crate) fn remove_child(&mut self, child: EntityHandle) {
        self.children.retain(|handle| *handle != child);
    }

    pub(crate) fn add_child(&mut self, child: EntityHandle) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }
}
