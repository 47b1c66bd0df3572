use bitflags::bitflags;

bitflags! {
    /// Per-object flags loaded from full updates.
    #[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct ObjectFlags: u32 {
        const USE_PHYSICS       = 0x0000_0001;
        const CREATE_SELECTED   = 0x0000_0002;
        const OBJECT_MODIFY     = 0x0000_0004;
        const OBJECT_COPY       = 0x0000_0008;
        const OBJECT_ANY_OWNER  = 0x0000_0010;
        const OBJECT_YOU_OWNER  = 0x0000_0020;
        const SCRIPTED          = 0x0000_0040;
        const HANDLE_TOUCH      = 0x0000_0080;
        const OBJECT_MOVE       = 0x0000_0100;
        const TAKES_MONEY       = 0x0000_0200;
        const PHANTOM           = 0x0000_0400;
        const INVENTORY_EMPTY   = 0x0000_0800;
        const AFFECTS_NAVMESH   = 0x0000_1000;
        const CHARACTER         = 0x0000_2000;
        const VOLUME_DETECT     = 0x0000_4000;
        const INCLUDE_IN_SEARCH = 0x0000_8000;
        const ALLOW_INVENTORY_DROP = 0x0001_0000;
        const OBJECT_TRANSFER   = 0x0002_0000;
        const OBJECT_GROUP_OWNED = 0x0004_0000;
        const CAMERA_DECOUPLED  = 0x0010_0000;
        const ANIM_SOURCE       = 0x0020_0000;
        const CAMERA_SOURCE     = 0x0040_0000;
        const OBJECT_OWNER_MODIFY = 0x1000_0000;
        const TEMPORARY_ON_REZ  = 0x2000_0000;
        const SERVER_AUTOPILOT  = 0x4000_0000;
    }
}

impl ObjectFlags {
    /// Bits owned by the client. Server flag loads leave these untouched.
    pub const LOCAL: ObjectFlags = ObjectFlags::ANIM_SOURCE.union(ObjectFlags::CAMERA_SOURCE);

    /// Raw value the simulator uses for "no flags in this update".
    pub const INVALID_RAW: u32 = u32::MAX;

    /// Merges server-sent flags, keeping local bits. Returns `None` when the
    /// raw value is the invalid marker.
    pub fn merged_with_server(self, raw: u32) -> Option<ObjectFlags> {
        if raw == Self::INVALID_RAW {
            return None;
        }
        Some((self & Self::LOCAL) | ObjectFlags::from_bits_retain(raw))
    }
}
