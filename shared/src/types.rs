use std::fmt;

use glam::DVec3;
use objsync_serde::{ByteReader, ByteWriter, ConstByteLength, Serde, SerdeErr};
use uuid::Uuid;

/// Region-scoped numeric handle carried in wire messages
pub type LocalId = u32;

/// Per-circuit packet ordinal used to discard old updates
pub type PacketId = u32;

// GlobalId
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct GlobalId(Uuid);

impl GlobalId {
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serde for GlobalId {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_uuid(&self.0);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self(reader.read_uuid()?))
    }

    fn byte_length(&self) -> usize {
        Self::const_byte_length()
    }
}

impl ConstByteLength for GlobalId {
    fn const_byte_length() -> usize {
        16
    }
}

// RegionHandle
/// Identifies a region by its global origin. The high 32 bits hold the
/// global x coordinate in metres, the low 32 bits the global y coordinate.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct RegionHandle(u64);

impl RegionHandle {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn from_origin(x: u32, y: u32) -> Self {
        Self(((x as u64) << 32) | y as u64)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn origin_x(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn origin_y(&self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub fn origin(&self) -> DVec3 {
        DVec3::new(self.origin_x() as f64, self.origin_y() as f64, 0.0)
    }
}

impl fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.origin_x(), self.origin_y())
    }
}

// PCode
/// Primitive category byte sent with every full update
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PCode {
    Volume,
    Avatar,
    Grass,
    ParticleSystem,
    Tree,
    LegacyTree,
    Other(u8),
}

impl PCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            9 => PCode::Volume,
            47 => PCode::Avatar,
            95 => PCode::Grass,
            111 => PCode::Tree,
            143 => PCode::ParticleSystem,
            255 => PCode::LegacyTree,
            other => PCode::Other(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            PCode::Volume => 9,
            PCode::Avatar => 47,
            PCode::Grass => 95,
            PCode::Tree => 111,
            PCode::ParticleSystem => 143,
            PCode::LegacyTree => 255,
            PCode::Other(other) => other,
        }
    }

    pub fn is_avatar(self) -> bool {
        self == PCode::Avatar
    }
}
