use std::{fmt, time::Instant};

use objsync_shared::{GlobalId, InventoryItem, InventorySerial};

use crate::world::EntityHandle;

/// Identifies one fetch of an entity's listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchId(u64);

impl FetchId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FetchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The outbound request a suspended fetch is waiting on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingRequest {
    Http {
        known_serial: Option<InventorySerial>,
    },
    TaskInventory,
    Xfer {
        filename: String,
        serial: InventorySerial,
    },
}

impl PendingRequest {
    pub fn name(&self) -> &'static str {
        match self {
            PendingRequest::Http { .. } => "http listing",
            PendingRequest::TaskInventory => "task inventory reply",
            PendingRequest::Xfer { .. } => "listing transfer",
        }
    }
}

/// A reply that resumes a suspended fetch
#[derive(Clone, Debug, PartialEq)]
pub enum FetchResponse {
    HttpContents {
        serial: InventorySerial,
        items: Vec<InventoryItem>,
    },
    /// The listing matching the serial we sent is still current
    HttpNotModified,
    HttpFailed {
        reason: String,
    },
    XferComplete {
        data: Vec<u8>,
    },
    XferFailed {
        reason: String,
    },
}

impl FetchResponse {
    pub fn name(&self) -> &'static str {
        match self {
            FetchResponse::HttpContents { .. } => "http contents",
            FetchResponse::HttpNotModified => "http not modified",
            FetchResponse::HttpFailed { .. } => "http failure",
            FetchResponse::XferComplete { .. } => "transfer complete",
            FetchResponse::XferFailed { .. } => "transfer failure",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FetchStage {
    Suspended(PendingRequest),
    Delayed { wake_at: Instant },
}

#[derive(Clone, Debug)]
pub(crate) struct FetchTask {
    pub(crate) entity: EntityHandle,
    pub(crate) global_id: GlobalId,
    pub(crate) stage: FetchStage,
    pub(crate) superseded: bool,
}
