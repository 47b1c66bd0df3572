use thiserror::Error;

use objsync_shared::{DecodeError, GlobalId, LocalId, RegionHandle};

use crate::{inventory::FetchId, world::EntityHandle};

/// Errors raised by entity registry lookups
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Handle is stale or was never issued
    #[error("Entity not found: {entity:?}")]
    EntityNotFound { entity: EntityHandle },

    /// No live entity carries this global id
    #[error("No entity with global id {global_id}")]
    UnknownGlobalId { global_id: GlobalId },

    /// Local id is not bound in the region
    #[error("Local id {local_id} is not bound in region {region}")]
    UnknownLocalId {
        region: RegionHandle,
        local_id: LocalId,
    },

    /// Region was never added or has been removed
    #[error("Unknown region {region}")]
    UnknownRegion { region: RegionHandle },

    /// A second entity was created with an id that is already live
    #[error("Entity with global id {global_id} already exists")]
    DuplicateGlobalId { global_id: GlobalId },
}

/// Errors raised by the inventory synchronizer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// No suspended fetch with this id
    #[error("Unknown inventory fetch {fetch}")]
    UnknownFetch { fetch: FetchId },

    /// The entity owning the fetch is no longer registered
    #[error("Inventory result for {global_id} discarded: entity is gone")]
    EntityGone { global_id: GlobalId },

    /// A newer fetch for the same entity has taken over
    #[error("Inventory fetch {fetch} was superseded by a newer fetch")]
    Superseded { fetch: FetchId },

    /// The response does not answer the request the fetch is suspended on
    #[error("Inventory fetch {fetch} is waiting for {expected}, got {received}")]
    UnexpectedResponse {
        fetch: FetchId,
        expected: &'static str,
        received: &'static str,
    },

    /// Stale listings kept arriving past the configured bound
    #[error("Gave up waiting for inventory serial {expected} of {global_id} after {retries} stale listings")]
    RetriesExhausted {
        global_id: GlobalId,
        expected: u16,
        retries: u32,
    },

    /// The legacy listing file could not be read
    #[error("Inventory listing for {global_id} is malformed: {reason}")]
    MalformedListing { global_id: GlobalId, reason: String },
}

/// Umbrella error for the sync engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
