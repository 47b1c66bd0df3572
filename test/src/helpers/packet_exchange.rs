use glam::{Quat, Vec3};
use objsync_serde::{ByteWriter, QuantizedRange};

use objsync_client::{
    shared::{LocalId, PacketId, RawObjectBlock, RegionHandle, UpdateKind},
    ObjectUpdateMessage, UpdateBlock,
};

/// Region every test world starts with
pub const TEST_REGION: RegionHandle = RegionHandle::from_origin(256_000, 256_000);

pub fn full_message(packet_id: PacketId, blocks: Vec<UpdateBlock>) -> ObjectUpdateMessage {
    ObjectUpdateMessage {
        kind: UpdateKind::Full,
        region_handle: TEST_REGION,
        time_dilation: u16::MAX,
        packet_id,
        blocks,
    }
}

pub fn terse_message(packet_id: PacketId, blocks: Vec<UpdateBlock>) -> ObjectUpdateMessage {
    ObjectUpdateMessage {
        kind: UpdateKind::TerseImproved,
        ..full_message(packet_id, blocks)
    }
}

pub fn compressed_message(packet_id: PacketId, blocks: Vec<UpdateBlock>) -> ObjectUpdateMessage {
    ObjectUpdateMessage {
        kind: UpdateKind::FullCompressed,
        ..full_message(packet_id, blocks)
    }
}

/// 16-bit quantized terse block for a 256 m region with the default
/// height range
pub fn terse_block(local_id: LocalId, position: Vec3, velocity: Vec3) -> UpdateBlock {
    let width = 256.0;
    let horizontal = QuantizedRange::new(-0.5 * width, 1.5 * width);
    let motion = [QuantizedRange::symmetric(width); 3];

    let mut writer = ByteWriter::new();
    writer.write_quantized_vec3(
        position,
        [horizontal, horizontal, QuantizedRange::new(-256.0, 4096.0)],
    );
    writer.write_quantized_vec3(velocity, motion);
    writer.write_quantized_vec3(Vec3::ZERO, motion);
    writer.write_quantized_vec4(Quat::IDENTITY.into(), QuantizedRange::symmetric(1.0));
    writer.write_quantized_vec3(Vec3::ZERO, motion);
    UpdateBlock::Raw(RawObjectBlock::terse(local_id, 0, writer.to_bytes()))
}
