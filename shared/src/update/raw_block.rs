use glam::Vec3;
use uuid::Uuid;

use crate::LocalId;

/// One block of a template-encoded (uncompressed) object update, with its
/// fields already split out by the message layer. Terse blocks only fill
/// `local_id`, `state` and `object_data`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawObjectBlock {
    pub full_id: Uuid,
    pub local_id: LocalId,
    pub pcode: u8,
    pub state: u8,
    pub crc: u32,
    pub parent_id: LocalId,
    pub sound: Uuid,
    pub owner_id: Uuid,
    pub gain: f32,
    pub radius: f32,
    pub sound_flags: u8,
    pub material: u8,
    pub click_action: u8,
    pub scale: Vec3,
    pub object_data: Vec<u8>,
    pub update_flags: u32,
    pub name_value: String,
    pub data: Vec<u8>,
    pub text: String,
    pub text_color: [u8; 4],
    pub media_url: String,
    pub ps_block: Vec<u8>,
    pub extra_params: Vec<u8>,
}

impl RawObjectBlock {
    pub fn terse(local_id: LocalId, state: u8, object_data: Vec<u8>) -> Self {
        Self {
            local_id,
            state,
            object_data,
            ..Default::default()
        }
    }
}
