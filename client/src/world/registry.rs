use std::{collections::HashMap, fmt, time::Instant};

use glam::{Quat, Vec3};
use log::{debug, warn};

use objsync_shared::{GlobalId, LocalId, PCode, RegionHandle};

use crate::{
    error::RegistryError,
    outbound::CacheMissKind,
    world::{Entity, LocalIdMap, RegionMap},
};

/// Stable reference to an entity in the registry. A handle outlives its
/// entity but never resolves to a later occupant of the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    index: u32,
    generation: u32,
}

impl EntityHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Owns every entity and the id tables pointing at them
pub struct EntityRegistry {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    global_to_handle: HashMap<GlobalId, EntityHandle>,
    local_ids: LocalIdMap,
    regions: RegionMap,
    cache_misses: HashMap<RegionHandle, Vec<(LocalId, CacheMissKind)>>,
    live: usize,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            global_to_handle: HashMap::new(),
            local_ids: LocalIdMap::new(),
            regions: RegionMap::new(),
            cache_misses: HashMap::new(),
            live: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut RegionMap {
        &mut self.regions
    }

    pub fn local_ids(&self) -> &LocalIdMap {
        &self.local_ids
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entity.as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entity.as_mut()
    }

    pub fn try_get(&self, handle: EntityHandle) -> Result<&Entity, RegistryError> {
        self.get(handle)
            .ok_or(RegistryError::EntityNotFound { entity: handle })
    }

    pub(crate) fn try_get_mut(&mut self, handle: EntityHandle) -> Result<&mut Entity, RegistryError> {
        self.get_mut(handle)
            .ok_or(RegistryError::EntityNotFound { entity: handle })
    }

    pub fn handle_of(&self, global_id: &GlobalId) -> Option<EntityHandle> {
        self.global_to_handle.get(global_id).copied()
    }

    pub fn handle_of_local(&self, region: RegionHandle, local_id: LocalId) -> Option<EntityHandle> {
        let global_id = self.local_ids.global_id(region, local_id)?;
        self.handle_of(&global_id)
    }

    pub fn try_handle_of_local(
        &self,
        region: RegionHandle,
        local_id: LocalId,
    ) -> Result<EntityHandle, RegistryError> {
        self.handle_of_local(region, local_id)
            .ok_or(RegistryError::UnknownLocalId { region, local_id })
    }

    pub fn handles(&self) -> Vec<EntityHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entity.is_some())
            .map(|(index, slot)| EntityHandle::new(index as u32, slot.generation))
            .collect()
    }

    /// Creates an entity and binds its local id. The region must be known.
    pub(crate) fn create(
        &mut self,
        global_id: GlobalId,
        region: RegionHandle,
        local_id: LocalId,
        pcode: PCode,
        now: Instant,
    ) -> Result<EntityHandle, RegistryError> {
        if self.global_to_handle.contains_key(&global_id) {
            return Err(RegistryError::DuplicateGlobalId { global_id });
        }
        if !self.regions.contains(&region) {
            return Err(RegistryError::UnknownRegion { region });
        }

        let entity = Entity::new(global_id, region, local_id, pcode, now);
        let handle = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entity = Some(entity);
                EntityHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entity: Some(entity),
                });
                EntityHandle::new(index, 0)
            }
        };
        self.global_to_handle.insert(global_id, handle);
        self.bind_local_id(handle, region, local_id)?;
        self.live += 1;
        debug!("Created entity {} as {} in region {}", global_id, handle, region);
        Ok(handle)
    }

    /// Binds `(region, local_id)` to the entity, displacing whatever held
    /// that pair and whatever pair the entity held before.
    pub(crate) fn bind_local_id(
        &mut self,
        handle: EntityHandle,
        region: RegionHandle,
        local_id: LocalId,
    ) -> Result<(), RegistryError> {
        let entity = self.try_get_mut(handle)?;
        entity.local_id = local_id;
        let global_id = entity.global_id;
        self.local_ids.insert(global_id, region, local_id);
        Ok(())
    }

    /// Removes the entity and its id bindings. Topology is left to the caller.
    pub(crate) fn destroy(&mut self, handle: EntityHandle) -> Result<Entity, RegistryError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(RegistryError::EntityNotFound { entity: handle })?;
        let entity = slot
            .entity
            .take()
            .ok_or(RegistryError::EntityNotFound { entity: handle })?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index);
        self.live -= 1;

        self.global_to_handle.remove(&entity.global_id);
        if self.local_ids.local_id(&entity.global_id) == Some((entity.region, entity.local_id)) {
            self.local_ids.remove_global(&entity.global_id);
        }
        Ok(entity)
    }

    /// Topmost ancestor that is not an avatar. Attachments stop at the
    /// avatar's child, so each attachment edits as its own root.
    pub fn edit_root(&self, handle: EntityHandle) -> Option<EntityHandle> {
        let mut root = handle;
        let mut entity = self.get(handle)?;
        for _ in 0..=self.live {
            let Some(parent_handle) = entity.parent() else {
                return Some(root);
            };
            let parent = self.get(parent_handle)?;
            if parent.is_avatar() {
                return Some(root);
            }
            root = parent_handle;
            entity = parent;
        }
        warn!("Parent chain of {} does not terminate", handle);
        None
    }

    /// Composes position and rotation through the parent chain into the
    /// frame of the entity's region.
    pub fn transform_region(&self, handle: EntityHandle) -> Option<(Vec3, Quat)> {
        let entity = self.get(handle)?;
        let mut position = entity.transform.position;
        let mut rotation = entity.transform.rotation;
        let mut current = entity;
        for _ in 0..=self.live {
            let Some(parent_handle) = current.parent() else {
                return Some((position, rotation));
            };
            let parent = self.get(parent_handle)?;
            position = parent.transform.position + parent.transform.rotation * position;
            rotation = parent.transform.rotation * rotation;
            current = parent;
        }
        warn!("Parent chain of {} does not terminate", handle);
        None
    }

    pub fn position_region(&self, handle: EntityHandle) -> Option<Vec3> {
        self.transform_region(handle).map(|(position, _)| position)
    }

    pub fn rotation_region(&self, handle: EntityHandle) -> Option<Quat> {
        self.transform_region(handle).map(|(_, rotation)| rotation)
    }

    pub(crate) fn set_selected(&mut self, handle: EntityHandle, selected: bool) -> Result<(), RegistryError> {
        self.try_get_mut(handle)?.selected = selected;
        Ok(())
    }

    /// Whether the entity or any of its descendants is selected
    pub fn is_any_selected(&self, handle: EntityHandle) -> bool {
        let mut stack = vec![handle];
        let mut visited = 0;
        while let Some(current) = stack.pop() {
            visited += 1;
            if visited > self.live {
                break;
            }
            let Some(entity) = self.get(current) else {
                continue;
            };
            if entity.selected {
                return true;
            }
            stack.extend(entity.children.iter().copied());
        }
        false
    }

    pub(crate) fn request_cache_miss(&mut self, region: RegionHandle, local_id: LocalId, kind: CacheMissKind) {
        let misses = self.cache_misses.entry(region).or_default();
        if !misses.iter().any(|(id, _)| *id == local_id) {
            misses.push((local_id, kind));
        }
    }

    pub(crate) fn drain_cache_misses(&mut self) -> Vec<(RegionHandle, Vec<(LocalId, CacheMissKind)>)> {
        let mut drained: Vec<_> = self.cache_misses.drain().collect();
        drained.sort_by_key(|(region, _)| *region);
        drained
    }
}
