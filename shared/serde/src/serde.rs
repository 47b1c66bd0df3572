use glam::{Vec3, Vec4};
use uuid::Uuid;

use crate::{ByteReader, ByteWriter, SerdeErr};

/// A type that can be packed into and unpacked from a little-endian buffer
pub trait Serde: Sized {
    fn ser(&self, writer: &mut ByteWriter);

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr>;

    fn byte_length(&self) -> usize;
}

/// A type whose packed size never varies
pub trait ConstByteLength {
    fn const_byte_length() -> usize;
}

macro_rules! impl_fixed {
    ($type:ty, $len:expr, $write:ident, $read:ident) => {
        impl Serde for $type {
            fn ser(&self, writer: &mut ByteWriter) {
                writer.$write(*self);
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                reader.$read()
            }

            fn byte_length(&self) -> usize {
                $len
            }
        }

        impl ConstByteLength for $type {
            fn const_byte_length() -> usize {
                $len
            }
        }
    };
}

impl_fixed!(u8, 1, write_u8, read_u8);
impl_fixed!(u16, 2, write_u16, read_u16);
impl_fixed!(u32, 4, write_u32, read_u32);
impl_fixed!(i32, 4, write_i32, read_i32);
impl_fixed!(u64, 8, write_u64, read_u64);
impl_fixed!(f32, 4, write_f32, read_f32);
impl_fixed!(Vec3, 12, write_vec3, read_vec3);
impl_fixed!(Vec4, 16, write_vec4, read_vec4);

impl Serde for Uuid {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_uuid(self);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        reader.read_uuid()
    }

    fn byte_length(&self) -> usize {
        16
    }
}

impl ConstByteLength for Uuid {
    fn const_byte_length() -> usize {
        16
    }
}

impl Serde for String {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_cstring(self);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        reader.read_cstring()
    }

    fn byte_length(&self) -> usize {
        self.len() + 1
    }
}
