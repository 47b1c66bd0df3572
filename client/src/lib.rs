//! # Objsync Client
//! Keeps a local copy of the objects a remote simulator streams to the
//! client: decodes their updates, links parents and children, predicts
//! motion between updates and keeps each object's content listing in step
//! with the simulator's serial.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use objsync_shared::{
        AssetType, ExtraParam, ExtraParamType, GlobalId, InventoryItem, InventoryKey,
        InventorySerial, LocalId, ObjectFlags, PCode, PacketId, RawObjectBlock, RegionHandle,
        UpdateKind,
    };
}

mod circuit;
mod config;
mod engine;
mod error;
mod events;
mod inventory;
mod motion;
mod outbound;
mod reconcile;
mod world;

pub use circuit::{CircuitStatus, IdealCircuit};
pub use config::{InterpolationConfig, InventoryConfig, SyncConfig, TopologyConfig};
pub use engine::{ObjectSyncEngine, ObjectUpdateMessage, UpdateBlock, UpdateReport};
pub use error::{InventoryError, RegistryError, SyncError};
pub use events::{
    ChangeEvent, ChangeFlags, EventCategory, InventoryEvent, LifecycleEvent, SyncEvent,
    SyncEvents, TopologyEvent,
};
pub use inventory::{
    FetchId, FetchResponse, InventoryCache, InventoryState, InventorySynchronizer,
    PendingRequest,
};
pub use motion::MotionExtrapolator;
pub use outbound::{CacheMissKind, OutboundRequest, Outbox};
pub use reconcile::{OrphanKey, OrphanWaitlist, ParentCycle, ParentReconciler, ReconcileOutcome};
pub use world::{
    Entity, EntityHandle, EntityRegistry, ExtraParamSlot, LocalIdMap, MotionState, RegionInfo,
    RegionMap, TopologyState, Transform, STATIC_EPSILON_SQUARED,
};
