//! # Objsync Shared
//! Identity types, inventory serial arithmetic and the object update decoder
//! shared by the objsync crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use objsync_serde::{
    ByteReader, ByteWriter, ConstByteLength, QuantizedRange, Serde, SerdeErr, MAX_BLOCK_SIZE,
};

pub mod inventory;
pub mod update;

mod object_flags;
mod serial;
mod types;

pub use inventory::{AssetType, InventoryItem, InventoryKey, ListingError};
pub use object_flags::ObjectFlags;
pub use serial::{serial_diff, serial_greater_than, serial_less_than, InventorySerial};
pub use types::{GlobalId, LocalId, PCode, PacketId, RegionHandle};
pub use update::*;
