use std::collections::VecDeque;

use uuid::Uuid;

use objsync_shared::{
    ExtraParam, ExtraParamType, GlobalId, InventoryItem, InventoryKey, InventorySerial, LocalId,
    ObjectFlags, RegionHandle,
};

use crate::inventory::FetchId;

/// Why the simulator is asked to resend an entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheMissKind {
    /// Nothing usable is known locally
    Full,
    /// A cached copy exists but its checksum disagrees
    Crc,
}

/// A message the engine wants the transport to send
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundRequest {
    RequestObjects {
        region: RegionHandle,
        local_ids: Vec<LocalId>,
        kind: CacheMissKind,
    },
    FetchInventory {
        fetch: FetchId,
        entity: GlobalId,
        known_serial: Option<InventorySerial>,
    },
    RequestTaskInventory {
        fetch: FetchId,
        region: RegionHandle,
        local_id: LocalId,
    },
    RequestXfer {
        fetch: FetchId,
        filename: String,
    },
    AbortXfer {
        fetch: FetchId,
    },
    UpdateInventory {
        region: RegionHandle,
        local_id: LocalId,
        item: InventoryItem,
        key: InventoryKey,
    },
    RemoveInventory {
        region: RegionHandle,
        local_id: LocalId,
        item_id: Uuid,
    },
    MoveInventory {
        region: RegionHandle,
        local_id: LocalId,
        folder_id: Uuid,
        item_id: Uuid,
    },
    MaterialUpdate {
        region: RegionHandle,
        local_id: LocalId,
        material: u8,
    },
    ShapeUpdate {
        region: RegionHandle,
        local_id: LocalId,
        param_type: ExtraParamType,
        param: Option<ExtraParam>,
    },
    FlagsUpdate {
        region: RegionHandle,
        local_id: LocalId,
        flags: ObjectFlags,
    },
}

/// Requests queued for the transport, drained in order
#[derive(Default)]
pub struct Outbox {
    requests: VecDeque<OutboundRequest>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutboundRequest> {
        self.requests.iter()
    }

    pub fn drain(&mut self) -> Vec<OutboundRequest> {
        self.requests.drain(..).collect()
    }

    pub(crate) fn push(&mut self, request: OutboundRequest) {
        self.requests.push_back(request);
    }
}
