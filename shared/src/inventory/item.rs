use uuid::Uuid;

use crate::GlobalId;

pub const PERM_TRANSFER: u32 = 1 << 13;
pub const PERM_MODIFY: u32 = 1 << 14;
pub const PERM_COPY: u32 = 1 << 15;

/// How an outbound inventory update identifies the entry it replaces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InventoryKey {
    /// Match an existing entry by item id
    Item,
    /// Match an existing entry by asset id
    Asset,
}

impl InventoryKey {
    pub fn to_u8(self) -> u8 {
        match self {
            InventoryKey::Item => 0,
            InventoryKey::Asset => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetType {
    Category,
    Texture,
    Sound,
    Landmark,
    Clothing,
    Object,
    Notecard,
    Script,
    BodyPart,
    Animation,
    Gesture,
    Material,
    Other(String),
}

impl AssetType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "category" => AssetType::Category,
            "texture" => AssetType::Texture,
            "sound" => AssetType::Sound,
            "landmark" => AssetType::Landmark,
            "clothing" => AssetType::Clothing,
            "object" => AssetType::Object,
            "notecard" => AssetType::Notecard,
            "lsltext" => AssetType::Script,
            "bodypart" => AssetType::BodyPart,
            "animatn" => AssetType::Animation,
            "gesture" => AssetType::Gesture,
            "material" => AssetType::Material,
            other => AssetType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AssetType::Category => "category",
            AssetType::Texture => "texture",
            AssetType::Sound => "sound",
            AssetType::Landmark => "landmark",
            AssetType::Clothing => "clothing",
            AssetType::Object => "object",
            AssetType::Notecard => "notecard",
            AssetType::Script => "lsltext",
            AssetType::BodyPart => "bodypart",
            AssetType::Animation => "animatn",
            AssetType::Gesture => "gesture",
            AssetType::Material => "material",
            AssetType::Other(other) => other,
        }
    }
}

/// One entry of an entity's content listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryItem {
    pub item_id: Uuid,
    pub parent_id: Uuid,
    pub asset_id: Uuid,
    pub asset_type: AssetType,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub owner_mask: u32,
    pub flags: u32,
    pub creation_date: i64,
}

impl InventoryItem {
    /// Root category every listing starts with. The server never sends it.
    pub fn contents_root(owner: GlobalId) -> Self {
        Self::category(owner.uuid(), Uuid::nil(), "Contents")
    }

    pub fn category(item_id: Uuid, parent_id: Uuid, name: &str) -> Self {
        Self {
            item_id,
            parent_id,
            asset_id: Uuid::nil(),
            asset_type: AssetType::Category,
            name: name.to_string(),
            description: String::new(),
            owner_id: Uuid::nil(),
            owner_mask: 0,
            flags: 0,
            creation_date: 0,
        }
    }

    pub fn is_category(&self) -> bool {
        self.asset_type == AssetType::Category
    }

    pub fn is_copyable(&self) -> bool {
        self.owner_mask & PERM_COPY != 0
    }
}
