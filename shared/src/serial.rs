use std::{cmp::Ordering, fmt};

/// Signed distance from `a` forward to `b` across the wrap.
///
/// # Examples
/// ```
/// # use objsync_shared::serial_diff;
/// assert_eq!(serial_diff(1, 2), 1);
/// assert_eq!(serial_diff(2, 1), -1);
/// assert_eq!(serial_diff(65535, 0), 1);
/// ```
pub fn serial_diff(a: u16, b: u16) -> i16 {
    b.wrapping_sub(a) as i16
}

/// Whether listing serial `a` was issued after `b`. A serial less than half
/// the space ahead is newer; exactly half ahead falls back to the raw
/// values so the relation stays antisymmetric.
pub fn serial_greater_than(a: u16, b: u16) -> bool {
    match serial_diff(b, a) {
        0 => false,
        i16::MIN => a > b,
        ahead => ahead > 0,
    }
}

pub fn serial_less_than(a: u16, b: u16) -> bool {
    serial_greater_than(b, a)
}

/// Version counter of an entity's content listing. Serials are sixteen bits
/// on the wire and are expected to wrap, so ordering is wrap-aware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InventorySerial(u16);

impl InventorySerial {
    pub const ZERO: InventorySerial = InventorySerial(0);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Serials travel as signed 16-bit values.
    pub const fn from_wire(value: i16) -> Self {
        Self(value as u16)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn to_wire(&self) -> i16 {
        self.0 as i16
    }

    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn previous(&self) -> Self {
        Self(self.0.wrapping_sub(1))
    }

    pub fn is_newer_than(&self, other: InventorySerial) -> bool {
        serial_greater_than(self.0, other.0)
    }

    pub fn is_older_than(&self, other: InventorySerial) -> bool {
        serial_less_than(self.0, other.0)
    }

    /// Wrap-aware ordering. Serials exactly half the space apart compare by
    /// their raw distance.
    pub fn wrapping_cmp(&self, other: InventorySerial) -> Ordering {
        if self.0 == other.0 {
            Ordering::Equal
        } else if self.is_newer_than(other) {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }

    pub fn max(self, other: InventorySerial) -> InventorySerial {
        if other.is_newer_than(self) {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for InventorySerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
