mod item;
mod listing;

pub use item::{AssetType, InventoryItem, InventoryKey, PERM_COPY, PERM_MODIFY, PERM_TRANSFER};
pub use listing::{parse_task_inventory, write_task_inventory, ListingError, MAX_UNKNOWN_TOKENS};
