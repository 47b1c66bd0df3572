use std::collections::HashMap;

use glam::{DVec3, Vec3};

use objsync_shared::{RegionBounds, RegionHandle};

/// A simulated region the client is connected to
#[derive(Clone, Debug, PartialEq)]
pub struct RegionInfo {
    pub handle: RegionHandle,
    pub width: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Simulator load factor in `(0, 1]`
    pub time_dilation: f32,
    /// Task inventory is fetched over HTTP instead of the transfer path
    pub has_task_inventory_capability: bool,
}

impl RegionInfo {
    pub fn new(handle: RegionHandle) -> Self {
        let bounds = RegionBounds::default();
        Self {
            handle,
            width: bounds.width,
            min_height: bounds.min_height,
            max_height: bounds.max_height,
            time_dilation: 1.0,
            has_task_inventory_capability: false,
        }
    }

    pub fn bounds(&self) -> RegionBounds {
        RegionBounds {
            width: self.width,
            min_height: self.min_height,
            max_height: self.max_height,
        }
    }

    pub fn origin(&self) -> DVec3 {
        self.handle.origin()
    }

    pub fn global_from_region(&self, position: Vec3) -> DVec3 {
        self.origin() + position.as_dvec3()
    }

    pub fn region_from_global(&self, position: DVec3) -> Vec3 {
        (position - self.origin()).as_vec3()
    }

    /// Whether a global position lies in this region's footprint
    pub fn contains_global(&self, position: DVec3) -> bool {
        let local = position - self.origin();
        let width = self.width as f64;
        local.x >= 0.0 && local.x < width && local.y >= 0.0 && local.y < width
    }

    /// Sets the dilation from its wire form, where 65535 is full speed.
    pub fn set_time_dilation_wire(&mut self, value: u16) {
        self.time_dilation = value as f32 / u16::MAX as f32;
    }
}

/// Regions known to the client, by handle
#[derive(Default)]
pub struct RegionMap {
    regions: HashMap<RegionHandle, RegionInfo>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: RegionInfo) -> Option<RegionInfo> {
        self.regions.insert(region.handle, region)
    }

    pub fn remove(&mut self, handle: &RegionHandle) -> Option<RegionInfo> {
        self.regions.remove(handle)
    }

    pub fn get(&self, handle: &RegionHandle) -> Option<&RegionInfo> {
        self.regions.get(handle)
    }

    pub fn get_mut(&mut self, handle: &RegionHandle) -> Option<&mut RegionInfo> {
        self.regions.get_mut(handle)
    }

    pub fn contains(&self, handle: &RegionHandle) -> bool {
        self.regions.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region_containing(&self, position: DVec3) -> Option<&RegionInfo> {
        self.regions
            .values()
            .find(|region| region.contains_global(position))
    }

    /// Keeps a predicted move from leaving the known world. When `new_position`
    /// lands in a known region nothing changes and `false` is returned.
    /// Otherwise it is clamped into the region `old_position` is in and
    /// `true` is returned.
    pub fn clip_to_known_regions(&self, old_position: DVec3, new_position: &mut DVec3) -> bool {
        if self.region_containing(*new_position).is_some() {
            return false;
        }
        let Some(region) = self.region_containing(old_position) else {
            *new_position = old_position;
            return true;
        };
        let origin = region.origin();
        let width = region.width as f64;
        new_position.x = new_position.x.clamp(origin.x, origin.x + width);
        new_position.y = new_position.y.clamp(origin.y, origin.y + width);
        true
    }
}
