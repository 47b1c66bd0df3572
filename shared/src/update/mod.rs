mod attachments;
mod decoder;
mod delta;
mod error;
mod extra_param;
mod kind;
mod raw_block;

pub use attachments::{AttachedSound, NameValue, TextLabel};
pub use decoder::{
    pack_rotation, peek_packed_full_id, unpack_rotation, DecodeOutcome, RegionBounds,
    UpdateDecoder, UpdateSource, LEGACY_PARTICLE_BLOCK_SIZE,
};
pub use delta::{FieldsPresent, UpdateDelta, UpdatePrecision};
pub use error::{DecodeError, FieldGroup};
pub use extra_param::{
    read_extra_params, write_extra_params, ExtendedMeshParams, ExtraParam, ExtraParamList,
    ExtraParamType, FlexibleParams, LightImageParams, LightParams, ReflectionProbeParams,
    RenderMaterialEntry, RenderMaterialParams, SculptParams,
};
pub use kind::{SpecialCode, UpdateKind};
pub use raw_block::RawObjectBlock;
