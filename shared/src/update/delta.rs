use bitflags::bitflags;
use glam::{Quat, Vec3, Vec4};
use uuid::Uuid;

use crate::{
    update::{AttachedSound, ExtraParam, NameValue, SpecialCode, TextLabel, UpdateKind},
    GlobalId, LocalId, PCode,
};

bitflags! {
    /// Which groups of an `UpdateDelta` carry authoritative values.
    /// For message-level groups a present flag with an empty value means
    /// "clear it".
    #[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct FieldsPresent: u32 {
        const POSITION         = 1 << 0;
        const VELOCITY         = 1 << 1;
        const ACCELERATION     = 1 << 2;
        const ROTATION         = 1 << 3;
        const ANGULAR_VELOCITY = 1 << 4;
        const SCALE            = 1 << 5;
        const COLLISION_PLANE  = 1 << 6;
        const PARENT           = 1 << 7;
        const MATERIAL         = 1 << 8;
        const CLICK_ACTION     = 1 << 9;
        const CRC              = 1 << 10;
        const STATE            = 1 << 11;
        const FLAGS            = 1 << 12;
        const OWNER            = 1 << 13;
        const SOUND            = 1 << 14;
        const TEXT             = 1 << 15;
        const MEDIA_URL        = 1 << 16;
        const NAME_VALUES      = 1 << 17;
        const EXTRA_PARAMS     = 1 << 18;
        const GENERIC_DATA     = 1 << 19;
        const PARTICLES        = 1 << 20;
    }
}

impl FieldsPresent {
    pub const MOTION: FieldsPresent = FieldsPresent::POSITION
        .union(FieldsPresent::VELOCITY)
        .union(FieldsPresent::ACCELERATION)
        .union(FieldsPresent::ROTATION)
        .union(FieldsPresent::ANGULAR_VELOCITY);
}

/// Bits of precision behind a positional update
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdatePrecision {
    Quantized16,
    Full32,
}

impl UpdatePrecision {
    pub fn bits(self) -> u8 {
        match self {
            UpdatePrecision::Quantized16 => 16,
            UpdatePrecision::Full32 => 32,
        }
    }
}

/// Canonical form of one per-entity block, whichever layout it arrived in
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateDelta {
    pub kind: UpdateKind,
    pub local_id: LocalId,
    pub full_id: Option<GlobalId>,
    pub pcode: Option<PCode>,
    pub fields: FieldsPresent,
    pub precision: Option<UpdatePrecision>,

    pub position: Option<Vec3>,
    pub velocity: Option<Vec3>,
    pub acceleration: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub angular_velocity: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub collision_plane: Option<Vec4>,

    pub parent: Option<LocalId>,
    pub material: Option<u8>,
    pub click_action: Option<u8>,
    pub crc: Option<u32>,
    pub state: Option<u8>,
    pub update_flags: Option<u32>,
    pub owner_id: Option<Uuid>,
    pub special_code: SpecialCode,

    pub sound: Option<AttachedSound>,
    pub text: Option<TextLabel>,
    pub media_url: Option<String>,
    pub name_values: Vec<NameValue>,
    pub extra_params: Vec<ExtraParam>,
    pub generic_data: Option<Vec<u8>>,
    pub particle_block: Option<Vec<u8>>,
}

impl UpdateDelta {
    pub fn new(kind: UpdateKind, local_id: LocalId) -> Self {
        Self {
            kind,
            local_id,
            full_id: None,
            pcode: None,
            fields: FieldsPresent::empty(),
            precision: None,
            position: None,
            velocity: None,
            acceleration: None,
            rotation: None,
            angular_velocity: None,
            scale: None,
            collision_plane: None,
            parent: None,
            material: None,
            click_action: None,
            crc: None,
            state: None,
            update_flags: None,
            owner_id: None,
            special_code: SpecialCode::empty(),
            sound: None,
            text: None,
            media_url: None,
            name_values: Vec::new(),
            extra_params: Vec::new(),
            generic_data: None,
            particle_block: None,
        }
    }

    pub fn has(&self, fields: FieldsPresent) -> bool {
        self.fields.contains(fields)
    }

    /// Declared parent, when the update carries topology. Zero means "no parent".
    pub fn declared_parent(&self) -> Option<Option<LocalId>> {
        if !self.has(FieldsPresent::PARENT) {
            return None;
        }
        Some(self.parent.filter(|id| *id != 0))
    }

    pub(crate) fn set_position(&mut self, value: Vec3) {
        self.position = Some(value);
        self.fields |= FieldsPresent::POSITION;
    }

    pub(crate) fn set_velocity(&mut self, value: Vec3) {
        self.velocity = Some(value);
        self.fields |= FieldsPresent::VELOCITY;
    }

    pub(crate) fn set_acceleration(&mut self, value: Vec3) {
        self.acceleration = Some(value);
        self.fields |= FieldsPresent::ACCELERATION;
    }

    pub(crate) fn set_rotation(&mut self, value: Quat) {
        self.rotation = Some(value);
        self.fields |= FieldsPresent::ROTATION;
    }

    pub(crate) fn set_angular_velocity(&mut self, value: Vec3) {
        self.angular_velocity = Some(value);
        self.fields |= FieldsPresent::ANGULAR_VELOCITY;
    }

    pub(crate) fn set_collision_plane(&mut self, value: Vec4) {
        self.collision_plane = Some(value);
        self.fields |= FieldsPresent::COLLISION_PLANE;
    }
}
