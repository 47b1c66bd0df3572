use objsync_shared::{InventoryItem, InventorySerial};

use crate::inventory::FetchId;

/// Where an entity's content listing is in its fetch cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InventoryState {
    Stopped,
    /// Legacy request sent, waiting for the serial and file name
    Pending,
    /// Legacy listing file is being transferred
    Xfer,
    /// Listing requested over HTTP
    HttpFetch,
    /// A retry is scheduled
    Waiting,
}

/// Per-entity content listing and the serials that version it
#[derive(Clone, Debug)]
pub struct InventoryCache {
    pub(crate) serial: InventorySerial,
    pub(crate) expected_serial: InventorySerial,
    pub(crate) state: InventoryState,
    pub(crate) contents: Option<Vec<InventoryItem>>,
    pub(crate) dirty: bool,
    pub(crate) active_fetch: Option<FetchId>,
    pub(crate) stale_retries: u32,
}

impl Default for InventoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryCache {
    pub fn new() -> Self {
        Self {
            serial: InventorySerial::ZERO,
            expected_serial: InventorySerial::ZERO,
            state: InventoryState::Stopped,
            contents: None,
            dirty: false,
            active_fetch: None,
            stale_retries: 0,
        }
    }

    /// Serial of the listing actually held
    pub fn serial(&self) -> InventorySerial {
        self.serial
    }

    /// Serial the listing should have once our own edits are applied
    pub fn expected_serial(&self) -> InventorySerial {
        self.expected_serial
    }

    pub fn state(&self) -> InventoryState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state != InventoryState::Stopped
    }

    /// `None` means never fetched, which is different from an empty listing.
    pub fn contents(&self) -> Option<&[InventoryItem]> {
        self.contents.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn active_fetch(&self) -> Option<FetchId> {
        self.active_fetch
    }

    pub fn stale_retries(&self) -> u32 {
        self.stale_retries
    }

    pub(crate) fn bump_expected(&mut self) {
        self.expected_serial = self.expected_serial.next();
    }

    pub(crate) fn finish(&mut self, contents: Vec<InventoryItem>) {
        self.contents = Some(contents);
        self.state = InventoryState::Stopped;
        self.active_fetch = None;
        self.dirty = false;
    }

    pub(crate) fn stop(&mut self) {
        self.state = InventoryState::Stopped;
        self.active_fetch = None;
    }

    /// Forgets everything. Serials are region-scoped, so this runs on handoff.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}
