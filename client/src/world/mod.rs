mod entity;
mod local_id_map;
mod region;
mod registry;

pub use entity::{
    Entity, ExtraParamSlot, MotionState, TopologyState, Transform, STATIC_EPSILON_SQUARED,
};
pub use local_id_map::LocalIdMap;
pub use region::{RegionInfo, RegionMap};
pub use registry::{EntityHandle, EntityRegistry};
