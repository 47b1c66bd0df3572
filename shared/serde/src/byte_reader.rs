use glam::{Vec3, Vec4};
use uuid::Uuid;

use crate::{quantize::u16_to_f32, QuantizedRange, SerdeErr, MAX_BLOCK_SIZE};

/// Cursor over a little-endian wire buffer. Every read either advances past
/// the whole field or leaves the cursor where it was.
pub struct ByteReader<'b> {
    buffer: &'b [u8],
    cursor: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        if self.remaining() < count {
            return Err(SerdeErr::UnexpectedEnd {
                offset: self.cursor,
                needed: count,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.cursor..self.cursor + count];
        self.cursor += count;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SerdeErr> {
        let bytes = self.read_bytes(N)?;
        let mut output = [0u8; N];
        output.copy_from_slice(bytes);
        Ok(output)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), SerdeErr> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SerdeErr> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, SerdeErr> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, SerdeErr> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, SerdeErr> {
        let bytes: [u8; 12] = self.read_array()?;
        Ok(Vec3::new(
            f32_at(&bytes, 0),
            f32_at(&bytes, 4),
            f32_at(&bytes, 8),
        ))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4, SerdeErr> {
        let bytes: [u8; 16] = self.read_array()?;
        Ok(Vec4::new(
            f32_at(&bytes, 0),
            f32_at(&bytes, 4),
            f32_at(&bytes, 8),
            f32_at(&bytes, 12),
        ))
    }

    /// Three 16-bit values, each mapped linearly into its own range.
    pub fn read_quantized_vec3(&mut self, ranges: [QuantizedRange; 3]) -> Result<Vec3, SerdeErr> {
        let bytes: [u8; 6] = self.read_array()?;
        Ok(Vec3::new(
            ranges[0].unpack(u16_at(&bytes, 0)),
            ranges[1].unpack(u16_at(&bytes, 2)),
            ranges[2].unpack(u16_at(&bytes, 4)),
        ))
    }

    /// Four 16-bit values sharing one range.
    pub fn read_quantized_vec4(&mut self, range: QuantizedRange) -> Result<Vec4, SerdeErr> {
        let bytes: [u8; 8] = self.read_array()?;
        Ok(Vec4::new(
            u16_to_f32(u16_at(&bytes, 0), range.lower, range.upper),
            u16_to_f32(u16_at(&bytes, 2), range.lower, range.upper),
            u16_to_f32(u16_at(&bytes, 4), range.lower, range.upper),
            u16_to_f32(u16_at(&bytes, 6), range.lower, range.upper),
        ))
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, SerdeErr> {
        Ok(Uuid::from_bytes(self.read_array()?))
    }

    /// Null-terminated UTF-8 string. The terminator is consumed whenever it
    /// is found, so invalid UTF-8 leaves the cursor at the next field.
    pub fn read_cstring(&mut self) -> Result<String, SerdeErr> {
        let start = self.cursor;
        let Some(length) = self.buffer[start..].iter().position(|byte| *byte == 0) else {
            return Err(SerdeErr::MissingTerminator { offset: start });
        };
        self.cursor += length + 1;
        std::str::from_utf8(&self.buffer[start..start + length])
            .map(str::to_string)
            .map_err(|_| SerdeErr::InvalidUtf8 { offset: start })
    }

    /// Block preceded by a signed 32-bit byte count.
    pub fn read_block(&mut self) -> Result<&'b [u8], SerdeErr> {
        let start = self.cursor;
        let length = self.read_i32()?;
        if length < 0 {
            self.cursor = start;
            return Err(SerdeErr::NegativeLength { offset: start, length });
        }
        let length = length as usize;
        if length > MAX_BLOCK_SIZE {
            self.cursor = start;
            return Err(SerdeErr::BlockTooLarge { length, max: MAX_BLOCK_SIZE });
        }
        match self.read_bytes(length) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                self.cursor = start;
                Err(err)
            }
        }
    }
}

fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}
