use glam::{Quat, Vec3};
use log::{debug, warn};
use objsync_serde::{ByteReader, QuantizedRange, SerdeErr};
use uuid::Uuid;

use crate::{
    update::{
        error::FieldGroup, extra_param::read_extra_params, AttachedSound, DecodeError,
        FieldsPresent, NameValue, RawObjectBlock, SpecialCode, TextLabel, UpdateDelta,
        UpdateKind, UpdatePrecision,
    },
    GlobalId, PCode,
};

/// Size of a legacy particle system block inside a packed update
pub const LEGACY_PARTICLE_BLOCK_SIZE: usize = 86;

const PLANE_SIZE: usize = 16;
const FULL_PRECISION_SIZE: usize = 60;
const TERSE_PRECISION_SIZE: usize = 32;

const PACKED_TERSE_VELOCITY: QuantizedRange = QuantizedRange::symmetric(128.0);
const PACKED_TERSE_ACCELERATION: QuantizedRange = QuantizedRange::symmetric(64.0);
const PACKED_TERSE_OMEGA: QuantizedRange = QuantizedRange::symmetric(64.0);
const ROTATION_RANGE: QuantizedRange = QuantizedRange::symmetric(1.0);

/// Geometry of the region an update was sent from. Drives the codomain of
/// 16-bit quantized fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionBounds {
    pub width: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self {
            width: 256.0,
            min_height: -256.0,
            max_height: 4096.0,
        }
    }
}

impl RegionBounds {
    fn terse_position_ranges(&self) -> [QuantizedRange; 3] {
        let horizontal = QuantizedRange::new(-0.5 * self.width, 1.5 * self.width);
        [
            horizontal,
            horizontal,
            QuantizedRange::new(self.min_height, self.max_height),
        ]
    }

    fn terse_motion_ranges(&self) -> [QuantizedRange; 3] {
        [QuantizedRange::symmetric(self.width); 3]
    }
}

/// Shape a block arrived in
#[derive(Clone, Copy, Debug)]
pub enum UpdateSource<'a> {
    /// Template fields split out by the message layer
    Raw(&'a RawObjectBlock),
    /// A structured buffer unpacked strictly in order. `update_flags` is
    /// only present for updates that came live from the simulator.
    Packed {
        data: &'a [u8],
        update_flags: Option<u32>,
    },
}

/// A decoded block plus the field groups that had to be skipped
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeOutcome {
    pub delta: UpdateDelta,
    pub errors: Vec<DecodeError>,
}

/// Translates wire blocks into `UpdateDelta`s. Holds no state between calls.
pub struct UpdateDecoder;

impl UpdateDecoder {
    pub fn decode(
        kind: UpdateKind,
        source: UpdateSource,
        bounds: &RegionBounds,
    ) -> Result<DecodeOutcome, DecodeError> {
        match (kind, source) {
            (UpdateKind::Full, UpdateSource::Raw(block)) => Ok(Self::decode_raw_full(block)),
            (UpdateKind::TerseImproved, UpdateSource::Raw(block)) => {
                Ok(Self::decode_raw_terse(block, bounds))
            }
            (UpdateKind::TerseImproved, UpdateSource::Packed { data, .. }) => {
                Self::decode_packed_terse(data)
            }
            (UpdateKind::FullCompressed | UpdateKind::FullCached, UpdateSource::Packed { data, update_flags }) => {
                Self::decode_packed_full(kind, data, update_flags)
            }
            (kind, UpdateSource::Raw(_)) => Err(DecodeError::UnsupportedSource { kind, shape: "raw" }),
            (kind, UpdateSource::Packed { .. }) => {
                Err(DecodeError::UnsupportedSource { kind, shape: "packed" })
            }
        }
    }

    fn decode_raw_full(block: &RawObjectBlock) -> DecodeOutcome {
        let mut delta = UpdateDelta::new(UpdateKind::Full, block.local_id);
        let mut errors = Vec::new();

        delta.full_id = Some(GlobalId::from_uuid(block.full_id));
        delta.pcode = Some(PCode::from_u8(block.pcode));
        delta.crc = Some(block.crc);
        delta.state = Some(block.state);
        delta.material = Some(block.material);
        delta.click_action = Some(block.click_action);
        delta.scale = Some(block.scale);
        delta.owner_id = Some(block.owner_id);
        delta.parent = Some(block.parent_id);
        delta.update_flags = Some(block.update_flags);
        delta.sound = AttachedSound::from_wire(
            block.sound,
            block.owner_id,
            block.gain,
            block.radius,
            block.sound_flags,
        );
        delta.fields |= FieldsPresent::CRC
            | FieldsPresent::STATE
            | FieldsPresent::MATERIAL
            | FieldsPresent::CLICK_ACTION
            | FieldsPresent::SCALE
            | FieldsPresent::OWNER
            | FieldsPresent::PARENT
            | FieldsPresent::FLAGS
            | FieldsPresent::SOUND;

        let data = &block.object_data;
        let (plane, body) = match data.len() {
            len if len == FULL_PRECISION_SIZE + PLANE_SIZE || len == 140 => (true, &data[..]),
            len if len == FULL_PRECISION_SIZE || len == 124 => (false, &data[..]),
            length => {
                warn!(
                    "Unexpected object data length {} for full update of local id {}",
                    length, block.local_id
                );
                errors.push(DecodeError::UnexpectedObjectDataLength {
                    kind: UpdateKind::Full,
                    local_id: block.local_id,
                    length,
                });
                (false, &[][..])
            }
        };
        if !body.is_empty() {
            let mut reader = ByteReader::new(body);
            if let Err(err) = read_full_precision(&mut reader, plane, &mut delta) {
                errors.push(DecodeError::truncated(FieldGroup::Positional)(err));
            }
        }

        if !block.name_value.is_empty() {
            delta.name_values = NameValue::parse_list(&block.name_value);
            delta.fields |= FieldsPresent::NAME_VALUES;
        }

        delta.generic_data = (!block.data.is_empty()).then(|| block.data.clone());
        delta.fields |= FieldsPresent::GENERIC_DATA;

        delta.text = (!block.text.is_empty())
            .then(|| TextLabel::from_wire(block.text.clone(), block.text_color));
        delta.fields |= FieldsPresent::TEXT;

        delta.media_url = (!block.media_url.is_empty()).then(|| block.media_url.clone());
        delta.fields |= FieldsPresent::MEDIA_URL;

        delta.particle_block = (!block.ps_block.is_empty()).then(|| block.ps_block.clone());
        delta.fields |= FieldsPresent::PARTICLES;

        if !block.extra_params.is_empty() {
            let list = read_extra_params(&mut ByteReader::new(&block.extra_params));
            delta.extra_params = list.params;
            errors.extend(list.errors);
        }
        delta.fields |= FieldsPresent::EXTRA_PARAMS;

        DecodeOutcome { delta, errors }
    }

    fn decode_raw_terse(block: &RawObjectBlock, bounds: &RegionBounds) -> DecodeOutcome {
        let mut delta = UpdateDelta::new(UpdateKind::TerseImproved, block.local_id);
        let mut errors = Vec::new();
        delta.state = Some(block.state);
        delta.fields |= FieldsPresent::STATE;

        let data = &block.object_data;
        let plane = match data.len() {
            len if len == TERSE_PRECISION_SIZE + PLANE_SIZE || len == 80 => Some(true),
            len if len == TERSE_PRECISION_SIZE || len == 64 => Some(false),
            _ => None,
        };
        let Some(plane) = plane else {
            warn!(
                "Unexpected object data length {} for terse update of local id {}",
                data.len(),
                block.local_id
            );
            errors.push(DecodeError::UnexpectedObjectDataLength {
                kind: UpdateKind::TerseImproved,
                local_id: block.local_id,
                length: data.len(),
            });
            return DecodeOutcome { delta, errors };
        };

        let mut reader = ByteReader::new(data);
        if let Err(err) = read_terse_precision(&mut reader, plane, bounds, &mut delta) {
            errors.push(DecodeError::truncated(FieldGroup::Positional)(err));
        }
        DecodeOutcome { delta, errors }
    }

    fn decode_packed_terse(data: &[u8]) -> Result<DecodeOutcome, DecodeError> {
        let mut reader = ByteReader::new(data);
        let local_id = reader
            .read_u32()
            .map_err(DecodeError::truncated(FieldGroup::Header))?;
        let mut delta = UpdateDelta::new(UpdateKind::TerseImproved, local_id);
        let mut errors = Vec::new();

        let result: Result<(), SerdeErr> = (|| {
            delta.state = Some(reader.read_u8()?);
            delta.fields |= FieldsPresent::STATE;
            let is_avatar = reader.read_u8()? != 0;
            if is_avatar {
                let plane = reader.read_vec4()?;
                delta.set_collision_plane(plane);
            }
            let position = reader.read_vec3()?;
            let velocity = reader.read_quantized_vec3([PACKED_TERSE_VELOCITY; 3])?;
            let acceleration = reader.read_quantized_vec3([PACKED_TERSE_ACCELERATION; 3])?;
            let rotation = reader.read_quantized_vec4(ROTATION_RANGE)?;
            let omega = reader.read_quantized_vec3([PACKED_TERSE_OMEGA; 3])?;

            delta.set_position(position);
            delta.set_velocity(velocity);
            delta.set_acceleration(acceleration);
            delta.set_rotation(normalized_quat(Quat::from_vec4(rotation)));
            delta.set_angular_velocity(omega);
            delta.precision = Some(UpdatePrecision::Full32);
            Ok(())
        })();
        if let Err(err) = result {
            errors.push(DecodeError::truncated(FieldGroup::Positional)(err));
        }
        Ok(DecodeOutcome { delta, errors })
    }

    fn decode_packed_full(
        kind: UpdateKind,
        data: &[u8],
        update_flags: Option<u32>,
    ) -> Result<DecodeOutcome, DecodeError> {
        let mut reader = ByteReader::new(data);
        let header = DecodeError::truncated(FieldGroup::Header);

        let full_id = reader.read_uuid().map_err(header)?;
        let local_id = reader
            .read_u32()
            .map_err(DecodeError::truncated(FieldGroup::Header))?;
        let mut delta = UpdateDelta::new(kind, local_id);
        delta.full_id = Some(GlobalId::from_uuid(full_id));

        let fixed: Result<(), SerdeErr> = (|| {
            delta.pcode = Some(PCode::from_u8(reader.read_u8()?));
            delta.state = Some(reader.read_u8()?);
            delta.crc = Some(reader.read_u32()?);
            delta.material = Some(reader.read_u8()?);
            delta.click_action = Some(reader.read_u8()?);
            delta.scale = Some(reader.read_vec3()?);
            let position = reader.read_vec3()?;
            let packed_rotation = reader.read_vec3()?;
            delta.special_code = SpecialCode::from_bits_retain(reader.read_u32()?);
            delta.owner_id = Some(reader.read_uuid()?);

            delta.set_position(position);
            delta.set_rotation(unpack_rotation(packed_rotation));
            delta.set_acceleration(Vec3::ZERO);
            delta.precision = Some(UpdatePrecision::Full32);
            Ok(())
        })();
        fixed.map_err(DecodeError::truncated(FieldGroup::Header))?;
        delta.fields |= FieldsPresent::STATE
            | FieldsPresent::CRC
            | FieldsPresent::MATERIAL
            | FieldsPresent::CLICK_ACTION
            | FieldsPresent::SCALE
            | FieldsPresent::OWNER;

        if let Some(flags) = update_flags {
            delta.update_flags = Some(flags);
            delta.fields |= FieldsPresent::FLAGS;
        }

        let mut errors = Vec::new();
        if let Err(err) = read_packed_optionals(&mut reader, &mut delta, &mut errors) {
            errors.push(err);
        }
        Ok(DecodeOutcome { delta, errors })
    }
}

/// Reads the optional groups of a packed full update in wire order. The
/// first truncated group stops the walk since every later offset depends
/// on it.
fn read_packed_optionals(
    reader: &mut ByteReader,
    delta: &mut UpdateDelta,
    errors: &mut Vec<DecodeError>,
) -> Result<(), DecodeError> {
    let code = delta.special_code;
    let owner_id = delta.owner_id.unwrap_or_default();

    if code.contains(SpecialCode::ANGULAR_VELOCITY) {
        let omega = reader
            .read_vec3()
            .map_err(DecodeError::truncated(FieldGroup::Positional))?;
        delta.set_angular_velocity(omega);
    }

    delta.parent = if code.contains(SpecialCode::PARENT) {
        Some(
            reader
                .read_u32()
                .map_err(DecodeError::truncated(FieldGroup::Topology))?,
        )
    } else {
        Some(0)
    };
    delta.fields |= FieldsPresent::PARENT;

    let scratch_pad = DecodeError::truncated(FieldGroup::ScratchPad);
    if code.contains(SpecialCode::TREE) {
        delta.generic_data = Some(vec![reader.read_u8().map_err(scratch_pad)?]);
    } else if code.contains(SpecialCode::SCRATCH_PAD) {
        let declared = reader
            .read_u32()
            .map_err(DecodeError::truncated(FieldGroup::ScratchPad))?;
        let block = reader
            .read_block()
            .map_err(DecodeError::truncated(FieldGroup::ScratchPad))?;
        if declared as usize != block.len() {
            debug!(
                "Scratch pad declared {} bytes but carried {}",
                declared,
                block.len()
            );
        }
        delta.generic_data = Some(block.to_vec());
    }
    delta.fields |= FieldsPresent::GENERIC_DATA;

    if code.contains(SpecialCode::TEXT) {
        let text = read_group_string(reader, FieldGroup::Text, errors)?;
        let color: [u8; 4] = reader
            .read_array()
            .map_err(DecodeError::truncated(FieldGroup::Text))?;
        if let Some(text) = text {
            delta.text = Some(TextLabel::from_wire(text, color));
            delta.fields |= FieldsPresent::TEXT;
        }
    } else {
        delta.fields |= FieldsPresent::TEXT;
    }

    if code.contains(SpecialCode::MEDIA_URL) {
        if let Some(url) = read_group_string(reader, FieldGroup::MediaUrl, errors)? {
            delta.media_url = (!url.is_empty()).then_some(url);
            delta.fields |= FieldsPresent::MEDIA_URL;
        }
    } else {
        delta.fields |= FieldsPresent::MEDIA_URL;
    }

    if code.contains(SpecialCode::PARTICLES_LEGACY) {
        let block = reader
            .read_bytes(LEGACY_PARTICLE_BLOCK_SIZE)
            .map_err(DecodeError::truncated(FieldGroup::Particles))?;
        delta.particle_block = Some(block.to_vec());
        delta.fields |= FieldsPresent::PARTICLES;
    } else if !code.contains(SpecialCode::PARTICLES_NEW) {
        delta.particle_block = None;
        delta.fields |= FieldsPresent::PARTICLES;
    }

    let list = read_extra_params(reader);
    let truncated = list
        .errors
        .iter()
        .any(|err| matches!(err, DecodeError::Truncated { .. }));
    delta.extra_params = list.params;
    delta.fields |= FieldsPresent::EXTRA_PARAMS;
    errors.extend(list.errors);
    if truncated {
        return Ok(());
    }

    if code.contains(SpecialCode::SOUND) {
        let sound = (|| -> Result<AttachedSound, SerdeErr> {
            let sound_id = reader.read_uuid()?;
            let gain = reader.read_f32()?;
            let flags = reader.read_u8()?;
            let radius = reader.read_f32()?;
            Ok(AttachedSound {
                sound_id,
                owner_id,
                gain,
                cutoff_radius: radius,
                flags,
            })
        })()
        .map_err(DecodeError::truncated(FieldGroup::Sound))?;
        delta.sound = (!sound.sound_id.is_nil()).then_some(sound);
    }
    delta.fields |= FieldsPresent::SOUND;

    if code.contains(SpecialCode::NAME_VALUE) {
        if let Some(text) = read_group_string(reader, FieldGroup::NameValue, errors)? {
            delta.name_values = NameValue::parse_list(&text);
            delta.fields |= FieldsPresent::NAME_VALUES;
        }
    }

    if !reader.is_empty() {
        debug!(
            "{} trailing bytes after packed update of local id {}",
            reader.remaining(),
            delta.local_id
        );
    }
    Ok(())
}

/// Reads a null-terminated string owned by `group`. Bad UTF-8 is recorded
/// and yields `None` with the cursor past the terminator; a missing
/// terminator still ends the block.
fn read_group_string(
    reader: &mut ByteReader,
    group: FieldGroup,
    errors: &mut Vec<DecodeError>,
) -> Result<Option<String>, DecodeError> {
    match reader.read_cstring() {
        Ok(text) => Ok(Some(text)),
        Err(source @ SerdeErr::InvalidUtf8 { .. }) => {
            warn!("Dropping {:?} group: {}", group, source);
            errors.push(DecodeError::InvalidText { group, source });
            Ok(None)
        }
        Err(source) => Err(DecodeError::Truncated { group, source }),
    }
}

fn read_full_precision(
    reader: &mut ByteReader,
    has_plane: bool,
    delta: &mut UpdateDelta,
) -> Result<(), SerdeErr> {
    if has_plane {
        let plane = reader.read_vec4()?;
        delta.set_collision_plane(plane);
    }
    let position = reader.read_vec3()?;
    let velocity = reader.read_vec3()?;
    let acceleration = reader.read_vec3()?;
    let rotation = reader.read_vec3()?;
    let omega = reader.read_vec3()?;

    delta.set_position(position);
    delta.set_velocity(velocity);
    delta.set_acceleration(acceleration);
    delta.set_rotation(unpack_rotation(rotation));
    delta.set_angular_velocity(omega);
    delta.precision = Some(UpdatePrecision::Full32);
    Ok(())
}

fn read_terse_precision(
    reader: &mut ByteReader,
    has_plane: bool,
    bounds: &RegionBounds,
    delta: &mut UpdateDelta,
) -> Result<(), SerdeErr> {
    if has_plane {
        let plane = reader.read_vec4()?;
        delta.set_collision_plane(plane);
    }
    let position = reader.read_quantized_vec3(bounds.terse_position_ranges())?;
    let velocity = reader.read_quantized_vec3(bounds.terse_motion_ranges())?;
    let acceleration = reader.read_quantized_vec3(bounds.terse_motion_ranges())?;
    let rotation = reader.read_quantized_vec4(ROTATION_RANGE)?;
    let omega = reader.read_quantized_vec3(bounds.terse_motion_ranges())?;

    delta.set_position(position);
    delta.set_velocity(velocity);
    delta.set_acceleration(acceleration);
    delta.set_rotation(normalized_quat(Quat::from_vec4(rotation)));
    delta.set_angular_velocity(omega);
    delta.precision = Some(UpdatePrecision::Quantized16);
    Ok(())
}

/// Rebuilds a unit quaternion from its vector part. The scalar part is
/// implied positive.
pub fn unpack_rotation(packed: Vec3) -> Quat {
    let remainder = 1.0 - packed.length_squared();
    let w = if remainder > 0.0 { remainder.sqrt() } else { 0.0 };
    normalized_quat(Quat::from_xyzw(packed.x, packed.y, packed.z, w))
}

/// Inverse of `unpack_rotation`.
pub fn pack_rotation(rotation: Quat) -> Vec3 {
    let rotation = if rotation.w < 0.0 { -rotation } else { rotation };
    Vec3::new(rotation.x, rotation.y, rotation.z)
}

fn normalized_quat(rotation: Quat) -> Quat {
    let length = rotation.length();
    if length > 0.0 && length.is_finite() {
        rotation / length
    } else if length == 0.0 {
        Quat::IDENTITY
    } else {
        rotation
    }
}

/// Id packed at the head of a full packed update, read without decoding
/// the rest. Used to resolve identity before decoding.
pub fn peek_packed_full_id(data: &[u8]) -> Option<(Uuid, u32)> {
    let mut reader = ByteReader::new(data);
    let id = reader.read_uuid().ok()?;
    let local_id = reader.read_u32().ok()?;
    Some((id, local_id))
}
