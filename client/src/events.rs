use std::vec::IntoIter;

use bitflags::bitflags;

use objsync_shared::{ExtraParamType, GlobalId, InventoryItem, InventorySerial, LocalId};

use crate::world::EntityHandle;

bitflags! {
    /// What part of an entity a collaborator has to refresh
    #[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct ChangeFlags: u32 {
        const MOVED      = 1 << 0;
        const SILHOUETTE = 1 << 1;
        const SCALED     = 1 << 2;
        const ROTATED    = 1 << 3;
        const TEXTURE    = 1 << 4;
        const GEOMETRY   = 1 << 5;
        const SHIFTED    = 1 << 6;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    Created {
        entity: EntityHandle,
        global_id: GlobalId,
    },
    Destroyed {
        entity: EntityHandle,
        global_id: GlobalId,
    },
    Changed {
        entity: EntityHandle,
        flags: ChangeFlags,
    },
    TopologyChanged {
        entity: EntityHandle,
        old_parent: Option<EntityHandle>,
        new_parent: Option<EntityHandle>,
    },
    Orphaned {
        entity: EntityHandle,
        awaiting: LocalId,
    },
    ExtraParamChanged {
        entity: EntityHandle,
        kind: ExtraParamType,
        in_use: bool,
    },
    SoundChanged {
        entity: EntityHandle,
    },
    TextChanged {
        entity: EntityHandle,
    },
    MediaUrlChanged {
        entity: EntityHandle,
    },
    InvalidUpdate {
        entity: EntityHandle,
        local_id: LocalId,
    },
    InventoryChanged {
        entity: EntityHandle,
        serial: InventorySerial,
        contents: Vec<InventoryItem>,
    },
    InventoryDesync {
        entity: EntityHandle,
        server_serial: InventorySerial,
        expected: InventorySerial,
    },
    InventoryFetchFailed {
        entity: EntityHandle,
        reason: String,
    },
}

impl SyncEvent {
    pub fn entity(&self) -> EntityHandle {
        match self {
            SyncEvent::Created { entity, .. }
            | SyncEvent::Destroyed { entity, .. }
            | SyncEvent::Changed { entity, .. }
            | SyncEvent::TopologyChanged { entity, .. }
            | SyncEvent::Orphaned { entity, .. }
            | SyncEvent::ExtraParamChanged { entity, .. }
            | SyncEvent::SoundChanged { entity }
            | SyncEvent::TextChanged { entity }
            | SyncEvent::MediaUrlChanged { entity }
            | SyncEvent::InvalidUpdate { entity, .. }
            | SyncEvent::InventoryChanged { entity, .. }
            | SyncEvent::InventoryDesync { entity, .. }
            | SyncEvent::InventoryFetchFailed { entity, .. } => *entity,
        }
    }
}

/// Change notifications queued for rendering, audio and UI collaborators
pub struct SyncEvents {
    events: Vec<SyncEvent>,
}

impl Default for SyncEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEvents {
    pub(crate) fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events.iter()
    }

    /// Takes every queued event of one category, leaving the rest in order.
    pub fn read<V: EventCategory>(&mut self) -> IntoIter<SyncEvent> {
        let (taken, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.events).into_iter().partition(V::accepts);
        self.events = kept;
        taken.into_iter()
    }

    pub fn has<V: EventCategory>(&self) -> bool {
        self.events.iter().any(V::accepts)
    }

    pub fn drain(&mut self) -> IntoIter<SyncEvent> {
        std::mem::take(&mut self.events).into_iter()
    }

    pub(crate) fn push(&mut self, event: SyncEvent) {
        self.events.push(event);
    }

    pub(crate) fn push_changed(&mut self, entity: EntityHandle, flags: ChangeFlags) {
        if !flags.is_empty() {
            self.events.push(SyncEvent::Changed { entity, flags });
        }
    }
}

// Event Category Trait
pub trait EventCategory {
    fn accepts(event: &SyncEvent) -> bool;
}

// Entity creation and destruction
pub struct LifecycleEvent;
impl EventCategory for LifecycleEvent {
    fn accepts(event: &SyncEvent) -> bool {
        matches!(event, SyncEvent::Created { .. } | SyncEvent::Destroyed { .. })
    }
}

// Transform, shape, texture and attachment changes
pub struct ChangeEvent;
impl EventCategory for ChangeEvent {
    fn accepts(event: &SyncEvent) -> bool {
        matches!(
            event,
            SyncEvent::Changed { .. }
                | SyncEvent::ExtraParamChanged { .. }
                | SyncEvent::SoundChanged { .. }
                | SyncEvent::TextChanged { .. }
                | SyncEvent::MediaUrlChanged { .. }
                | SyncEvent::InvalidUpdate { .. }
        )
    }
}

// Parent/child changes
pub struct TopologyEvent;
impl EventCategory for TopologyEvent {
    fn accepts(event: &SyncEvent) -> bool {
        matches!(
            event,
            SyncEvent::TopologyChanged { .. } | SyncEvent::Orphaned { .. }
        )
    }
}

// Inventory listings, desyncs and failures
pub struct InventoryEvent;
impl EventCategory for InventoryEvent {
    fn accepts(event: &SyncEvent) -> bool {
        matches!(
            event,
            SyncEvent::InventoryChanged { .. }
                | SyncEvent::InventoryDesync { .. }
                | SyncEvent::InventoryFetchFailed { .. }
        )
    }
}
