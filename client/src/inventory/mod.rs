mod cache;
mod fetch;
mod synchronizer;

pub use cache::{InventoryCache, InventoryState};
pub use fetch::{FetchId, FetchResponse, PendingRequest};
pub use synchronizer::InventorySynchronizer;
