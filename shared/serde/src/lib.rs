mod byte_reader;
mod byte_writer;
mod error;
mod quantize;
mod serde;

pub use byte_reader::ByteReader;
pub use byte_writer::ByteWriter;
pub use error::SerdeErr;
pub use quantize::{f32_to_u16, quantization_step, u16_to_f32, QuantizedRange};
pub use serde::{ConstByteLength, Serde};

/// Largest length-prefixed block the reader will hand out.
pub const MAX_BLOCK_SIZE: usize = 1024;
