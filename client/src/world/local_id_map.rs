use std::collections::HashMap;

use log::debug;

use objsync_shared::{GlobalId, LocalId, RegionHandle};

/// Two-way table between region-scoped local ids and global ids
pub struct LocalIdMap {
    global_to_local: HashMap<GlobalId, (RegionHandle, LocalId)>,
    local_to_global: HashMap<(RegionHandle, LocalId), GlobalId>,
}

impl Default for LocalIdMap {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdMap {
    pub fn new() -> Self {
        Self {
            global_to_local: HashMap::new(),
            local_to_global: HashMap::new(),
        }
    }

    /// Binds `global_id` to `(region, local_id)`. A previous binding of
    /// either side is dropped, so re-entry into a region and local id reuse
    /// never leave stale pairs behind. Returns the binding `global_id` had.
    pub fn insert(
        &mut self,
        global_id: GlobalId,
        region: RegionHandle,
        local_id: LocalId,
    ) -> Option<(RegionHandle, LocalId)> {
        let key = (region, local_id);
        if let Some(previous_owner) = self.local_to_global.get(&key).copied() {
            if previous_owner == global_id {
                return Some(key);
            }
            debug!(
                "Local id {} in region {} moves from {} to {}",
                local_id, region, previous_owner, global_id
            );
            self.global_to_local.remove(&previous_owner);
        }

        let old_key = self.global_to_local.insert(global_id, key);
        if let Some(old_key) = old_key {
            self.local_to_global.remove(&old_key);
        }
        self.local_to_global.insert(key, global_id);
        old_key
    }

    pub fn global_id(&self, region: RegionHandle, local_id: LocalId) -> Option<GlobalId> {
        self.local_to_global.get(&(region, local_id)).copied()
    }

    pub fn local_id(&self, global_id: &GlobalId) -> Option<(RegionHandle, LocalId)> {
        self.global_to_local.get(global_id).copied()
    }

    pub fn remove_global(&mut self, global_id: &GlobalId) -> Option<(RegionHandle, LocalId)> {
        let key = self.global_to_local.remove(global_id)?;
        self.local_to_global.remove(&key);
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.global_to_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global_to_local.is_empty()
    }
}
