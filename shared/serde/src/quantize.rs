const U16_MAX_F32: f32 = u16::MAX as f32;

/// Maps a 16-bit wire value linearly onto `[lower, upper]`.
/// Values within one step of zero decode as exactly zero.
pub fn u16_to_f32(value: u16, lower: f32, upper: f32) -> f32 {
    let delta = upper - lower;
    let output = (value as f32 / U16_MAX_F32) * delta + lower;
    if output.abs() < quantization_step(lower, upper) {
        return 0.0;
    }
    output
}

/// Clamps into `[lower, upper]` and rounds to the nearest 16-bit step.
pub fn f32_to_u16(value: f32, lower: f32, upper: f32) -> u16 {
    let value = if value.is_nan() { lower } else { value.clamp(lower, upper) };
    let normalized = (value - lower) / (upper - lower);
    (U16_MAX_F32 * normalized + 0.5).floor() as u16
}

/// Width of one 16-bit step across `[lower, upper]`.
pub fn quantization_step(lower: f32, upper: f32) -> f32 {
    (upper - lower) / U16_MAX_F32
}

/// A closed range a 16-bit component is scaled across.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizedRange {
    pub lower: f32,
    pub upper: f32,
}

impl QuantizedRange {
    pub const fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    pub const fn symmetric(extent: f32) -> Self {
        Self {
            lower: -extent,
            upper: extent,
        }
    }

    pub fn unpack(&self, value: u16) -> f32 {
        u16_to_f32(value, self.lower, self.upper)
    }

    pub fn pack(&self, value: f32) -> u16 {
        f32_to_u16(value, self.lower, self.upper)
    }

    pub fn step(&self) -> f32 {
        quantization_step(self.lower, self.upper)
    }
}
