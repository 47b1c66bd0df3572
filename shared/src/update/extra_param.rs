use glam::Vec3;
use log::debug;
use objsync_serde::{ByteReader, ByteWriter, SerdeErr};
use uuid::Uuid;

use crate::update::{error::FieldGroup, DecodeError};

/// Wire tags of the extra parameter blocks this engine understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtraParamType {
    Flexible,
    Light,
    Sculpt,
    LightImage,
    ExtendedMesh,
    RenderMaterial,
    ReflectionProbe,
}

impl ExtraParamType {
    pub const ALL: [ExtraParamType; 7] = [
        ExtraParamType::Flexible,
        ExtraParamType::Light,
        ExtraParamType::Sculpt,
        ExtraParamType::LightImage,
        ExtraParamType::ExtendedMesh,
        ExtraParamType::RenderMaterial,
        ExtraParamType::ReflectionProbe,
    ];

    /// Mesh blocks share the sculpt payload and are stored as sculpt.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x10 => Some(ExtraParamType::Flexible),
            0x20 => Some(ExtraParamType::Light),
            0x30 | 0x60 => Some(ExtraParamType::Sculpt),
            0x40 => Some(ExtraParamType::LightImage),
            0x70 => Some(ExtraParamType::ExtendedMesh),
            0x80 => Some(ExtraParamType::RenderMaterial),
            0x90 => Some(ExtraParamType::ReflectionProbe),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            ExtraParamType::Flexible => 0x10,
            ExtraParamType::Light => 0x20,
            ExtraParamType::Sculpt => 0x30,
            ExtraParamType::LightImage => 0x40,
            ExtraParamType::ExtendedMesh => 0x70,
            ExtraParamType::RenderMaterial => 0x80,
            ExtraParamType::ReflectionProbe => 0x90,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlexibleParams {
    pub simulate_lod: u8,
    pub tension: f32,
    pub air_friction: f32,
    pub gravity: f32,
    pub wind_sensitivity: f32,
    pub user_force: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightParams {
    pub color: [u8; 4],
    pub radius: f32,
    pub cutoff: f32,
    pub falloff: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SculptParams {
    pub texture: Uuid,
    pub sculpt_type: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightImageParams {
    pub texture: Uuid,
    pub params: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtendedMeshParams {
    pub flags: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderMaterialEntry {
    pub face: u8,
    pub material: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RenderMaterialParams {
    pub entries: Vec<RenderMaterialEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReflectionProbeParams {
    pub ambiance: f32,
    pub clip_distance: f32,
    pub flags: u8,
}

/// A decoded extra parameter block
#[derive(Clone, Debug, PartialEq)]
pub enum ExtraParam {
    Flexible(FlexibleParams),
    Light(LightParams),
    Sculpt(SculptParams),
    LightImage(LightImageParams),
    ExtendedMesh(ExtendedMeshParams),
    RenderMaterial(RenderMaterialParams),
    ReflectionProbe(ReflectionProbeParams),
}

impl ExtraParam {
    pub fn param_type(&self) -> ExtraParamType {
        match self {
            ExtraParam::Flexible(_) => ExtraParamType::Flexible,
            ExtraParam::Light(_) => ExtraParamType::Light,
            ExtraParam::Sculpt(_) => ExtraParamType::Sculpt,
            ExtraParam::LightImage(_) => ExtraParamType::LightImage,
            ExtraParam::ExtendedMesh(_) => ExtraParamType::ExtendedMesh,
            ExtraParam::RenderMaterial(_) => ExtraParamType::RenderMaterial,
            ExtraParam::ReflectionProbe(_) => ExtraParamType::ReflectionProbe,
        }
    }

    /// Decodes one block. Unknown tags yield `Ok(None)` so newer parameter
    /// kinds pass through harmlessly.
    pub fn parse(param_type: u16, data: &[u8]) -> Result<Option<ExtraParam>, DecodeError> {
        let Some(kind) = ExtraParamType::from_u16(param_type) else {
            debug!("Skipping unknown extra parameter 0x{:02x}", param_type);
            return Ok(None);
        };
        let malformed = |reason: &'static str| DecodeError::ExtraParam {
            param_type,
            size: data.len(),
            reason,
        };
        let short = |_: SerdeErr| malformed("block too short");

        let mut reader = ByteReader::new(data);
        let param = match kind {
            ExtraParamType::Flexible => {
                let bytes: [u8; 4] = reader.read_array().map_err(short)?;
                let user_force = if reader.remaining() >= 12 {
                    reader.read_vec3().map_err(short)?
                } else {
                    Vec3::ZERO
                };
                ExtraParam::Flexible(FlexibleParams {
                    simulate_lod: ((bytes[0] & 0x80) >> 6) + ((bytes[1] & 0x80) >> 7),
                    tension: (bytes[0] & 0x7F) as f32 / 10.0,
                    air_friction: (bytes[1] & 0x7F) as f32 / 10.0,
                    gravity: bytes[2] as f32 / 10.0 - 10.0,
                    wind_sensitivity: bytes[3] as f32 / 10.0,
                    user_force,
                })
            }
            ExtraParamType::Light => {
                let color: [u8; 4] = reader.read_array().map_err(short)?;
                ExtraParam::Light(LightParams {
                    color,
                    radius: reader.read_f32().map_err(short)?,
                    cutoff: reader.read_f32().map_err(short)?,
                    falloff: reader.read_f32().map_err(short)?,
                })
            }
            ExtraParamType::Sculpt => ExtraParam::Sculpt(SculptParams {
                texture: reader.read_uuid().map_err(short)?,
                sculpt_type: reader.read_u8().map_err(short)?,
            }),
            ExtraParamType::LightImage => ExtraParam::LightImage(LightImageParams {
                texture: reader.read_uuid().map_err(short)?,
                params: reader.read_vec3().map_err(short)?,
            }),
            ExtraParamType::ExtendedMesh => ExtraParam::ExtendedMesh(ExtendedMeshParams {
                flags: reader.read_u32().map_err(short)?,
            }),
            ExtraParamType::RenderMaterial => {
                let count = reader.read_u8().map_err(short)?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    entries.push(RenderMaterialEntry {
                        face: reader.read_u8().map_err(short)?,
                        material: reader.read_uuid().map_err(short)?,
                    });
                }
                ExtraParam::RenderMaterial(RenderMaterialParams { entries })
            }
            ExtraParamType::ReflectionProbe => {
                let ambiance = reader.read_f32().map_err(short)?;
                let clip_distance = reader.read_f32().map_err(short)?;
                let flags = reader.read_u8().map_err(short)?;
                if !ambiance.is_finite() || !clip_distance.is_finite() {
                    return Err(malformed("non-finite probe value"));
                }
                ExtraParam::ReflectionProbe(ReflectionProbeParams {
                    ambiance,
                    clip_distance,
                    flags,
                })
            }
        };
        Ok(Some(param))
    }

    /// Packs the payload, without type tag or length prefix.
    pub fn write(&self, writer: &mut ByteWriter) {
        match self {
            ExtraParam::Flexible(flex) => {
                let tension = (flex.tension * 10.0).round().clamp(0.0, 127.0) as u8;
                let friction = (flex.air_friction * 10.0).round().clamp(0.0, 127.0) as u8;
                writer.write_u8(tension | ((flex.simulate_lod & 0x02) << 6));
                writer.write_u8(friction | ((flex.simulate_lod & 0x01) << 7));
                writer.write_u8(((flex.gravity + 10.0) * 10.0).round().clamp(0.0, 255.0) as u8);
                writer.write_u8((flex.wind_sensitivity * 10.0).round().clamp(0.0, 255.0) as u8);
                writer.write_vec3(flex.user_force);
            }
            ExtraParam::Light(light) => {
                writer.write_bytes(&light.color);
                writer.write_f32(light.radius);
                writer.write_f32(light.cutoff);
                writer.write_f32(light.falloff);
            }
            ExtraParam::Sculpt(sculpt) => {
                writer.write_uuid(&sculpt.texture);
                writer.write_u8(sculpt.sculpt_type);
            }
            ExtraParam::LightImage(image) => {
                writer.write_uuid(&image.texture);
                writer.write_vec3(image.params);
            }
            ExtraParam::ExtendedMesh(mesh) => writer.write_u32(mesh.flags),
            ExtraParam::RenderMaterial(materials) => {
                writer.write_u8(materials.entries.len() as u8);
                for entry in &materials.entries {
                    writer.write_u8(entry.face);
                    writer.write_uuid(&entry.material);
                }
            }
            ExtraParam::ReflectionProbe(probe) => {
                writer.write_f32(probe.ambiance);
                writer.write_f32(probe.clip_distance);
                writer.write_u8(probe.flags);
            }
        }
    }
}

/// Result of unpacking an extra parameter list
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtraParamList {
    pub params: Vec<ExtraParam>,
    pub errors: Vec<DecodeError>,
    pub skipped_unknown: usize,
}

/// Unpacks `u8 count` followed by `count` entries of `u16 type, i32 size, bytes`.
/// A malformed entry is skipped on its own. A truncated list stops at the
/// last complete entry.
pub fn read_extra_params(reader: &mut ByteReader) -> ExtraParamList {
    let mut list = ExtraParamList::default();
    let count = match reader.read_u8() {
        Ok(count) => count,
        Err(err) => {
            list.errors.push(DecodeError::truncated(FieldGroup::ExtraParams)(err));
            return list;
        }
    };
    for _ in 0..count {
        let entry = reader
            .read_u16()
            .and_then(|param_type| reader.read_block().map(|data| (param_type, data)));
        let (param_type, data) = match entry {
            Ok(entry) => entry,
            Err(err) => {
                list.errors.push(DecodeError::truncated(FieldGroup::ExtraParams)(err));
                return list;
            }
        };
        match ExtraParam::parse(param_type, data) {
            Ok(Some(param)) => list.params.push(param),
            Ok(None) => list.skipped_unknown += 1,
            Err(err) => list.errors.push(err),
        }
    }
    list
}

/// Packs a parameter list in the wire layout read by `read_extra_params`.
pub fn write_extra_params(writer: &mut ByteWriter, params: &[ExtraParam]) {
    writer.write_u8(params.len() as u8);
    for param in params {
        let mut payload = ByteWriter::new();
        param.write(&mut payload);
        writer.write_u16(param.param_type().to_u16());
        writer.write_block(&payload.to_bytes());
    }
}
