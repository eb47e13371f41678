// ABOUTME: Raw value and access width definitions for register I/O
// ABOUTME: Handles the four access widths and bit range extraction helpers

use core::fmt;

/// Raw value read from or written to hardware
pub type Value = u64;

/// Access width of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BitWidth {
    /// 8-bit access
    Bits8,
    /// 16-bit access
    Bits16,
    /// 32-bit access
    Bits32,
    /// 64-bit access
    Bits64,
}

impl BitWidth {
    /// Convert a bit count to a width
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(BitWidth::Bits8),
            16 => Some(BitWidth::Bits16),
            32 => Some(BitWidth::Bits32),
            64 => Some(BitWidth::Bits64),
            _ => None,
        }
    }

    /// Number of bits in this width
    pub fn bits(self) -> u32 {
        match self {
            BitWidth::Bits8 => 8,
            BitWidth::Bits16 => 16,
            BitWidth::Bits32 => 32,
            BitWidth::Bits64 => 64,
        }
    }

    /// Number of bytes in this width
    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Mask covering every bit of this width
    pub fn mask(self) -> Value {
        mask(self.bits())
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Mask with the low `bits` bits set
pub fn mask(bits: u32) -> Value {
    if bits >= Value::BITS {
        Value::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Inclusive range of bits within a value, `lo..=hi`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRange {
    /// Lowest bit position
    pub lo: u32,
    /// Highest bit position
    pub hi: u32,
}

impl BitRange {
    /// Create a range, swapping the bounds if given in reverse
    pub fn new(lo: u32, hi: u32) -> Self {
        if lo <= hi {
            Self { lo, hi }
        } else {
            Self { lo: hi, hi: lo }
        }
    }

    /// A range covering one bit
    pub fn bit(position: u32) -> Self {
        Self::new(position, position)
    }

    /// Number of bits covered
    pub fn width(&self) -> u32 {
        (self.hi - self.lo).saturating_add(1)
    }

    /// Extract the bits of this range from `value`, shifted down to bit 0
    ///
    /// Positions at or above [`Value::BITS`] read as zero.
    pub fn extract(&self, value: Value) -> Value {
        value.checked_shr(self.lo).unwrap_or(0) & mask(self.width())
    }

    /// Replace the bits of this range in `value` with the low bits of `bits`
    ///
    /// Positions at or above [`Value::BITS`] are dropped.
    pub fn insert(&self, value: Value, bits: Value) -> Value {
        let field_mask = mask(self.width()).checked_shl(self.lo).unwrap_or(0);
        (value & !field_mask) | (bits.checked_shl(self.lo).unwrap_or(0) & field_mask)
    }
}
