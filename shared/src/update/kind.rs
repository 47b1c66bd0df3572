use bitflags::bitflags;

/// Discriminant carried by every inbound object update message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Full,
    TerseImproved,
    FullCompressed,
    FullCached,
}

impl UpdateKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(UpdateKind::Full),
            1 => Some(UpdateKind::TerseImproved),
            2 => Some(UpdateKind::FullCompressed),
            3 => Some(UpdateKind::FullCached),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            UpdateKind::Full => 0,
            UpdateKind::TerseImproved => 1,
            UpdateKind::FullCompressed => 2,
            UpdateKind::FullCached => 3,
        }
    }

    /// Terse updates never carry topology or message-level fields.
    pub fn is_terse(self) -> bool {
        self == UpdateKind::TerseImproved
    }

    pub fn is_packed_full(self) -> bool {
        matches!(self, UpdateKind::FullCompressed | UpdateKind::FullCached)
    }
}

bitflags! {
    /// Presence mask for the optional groups of a packed full update.
    /// Groups follow the fixed header in bit order of the unpacking sequence,
    /// not in numeric order.
    #[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct SpecialCode: u32 {
        const SCRATCH_PAD      = 0x001;
        const TREE             = 0x002;
        const TEXT             = 0x004;
        const PARTICLES_LEGACY = 0x008;
        const SOUND            = 0x010;
        const PARENT           = 0x020;
        const TEXTURE_ANIM     = 0x040;
        const ANGULAR_VELOCITY = 0x080;
        const NAME_VALUE       = 0x100;
        const MEDIA_URL        = 0x200;
        const PARTICLES_NEW    = 0x400;
    }
}
