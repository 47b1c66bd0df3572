use glam::{Vec3, Vec4};
use uuid::Uuid;

use crate::{quantize::f32_to_u16, QuantizedRange};

/// A growable little-endian writer. Used to pack outbound requests and to
/// build wire buffers in tests.
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(256),
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_vec3(&mut self, value: Vec3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    pub fn write_vec4(&mut self, value: Vec4) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
        self.write_f32(value.w);
    }

    pub fn write_quantized_vec3(&mut self, value: Vec3, ranges: [QuantizedRange; 3]) {
        self.write_u16(ranges[0].pack(value.x));
        self.write_u16(ranges[1].pack(value.y));
        self.write_u16(ranges[2].pack(value.z));
    }

    pub fn write_quantized_vec4(&mut self, value: Vec4, range: QuantizedRange) {
        for component in value.to_array() {
            self.write_u16(f32_to_u16(component, range.lower, range.upper));
        }
    }

    pub fn write_uuid(&mut self, value: &Uuid) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_cstring(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
        self.write_u8(0);
    }

    pub fn write_block(&mut self, bytes: &[u8]) {
        self.write_i32(bytes.len() as i32);
        self.write_bytes(bytes);
    }
}
