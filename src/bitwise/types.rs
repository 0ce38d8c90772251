// Common type definitions for layout parsing

use serde::{Deserialize, Serialize};

/// Endianness for multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Big,
    Little,
}

/// Integer width mode, governs how `.i` and `.l` declarations resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum IntegerWidth {
    Bits16,
    Bits32,
    Bits64,
}

impl IntegerWidth {
    /// Byte size of an `.i` element
    pub fn int_size(&self) -> usize {
        match self {
            IntegerWidth::Bits16 | IntegerWidth::Bits32 => 2,
            IntegerWidth::Bits64 => 4,
        }
    }

    /// Byte size of an `.l` element
    pub fn long_size(&self) -> usize {
        match self {
            IntegerWidth::Bits16 => 2,
            IntegerWidth::Bits32 => 4,
            IntegerWidth::Bits64 => 8,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            IntegerWidth::Bits16 => 16,
            IntegerWidth::Bits32 => 32,
            IntegerWidth::Bits64 => 64,
        }
    }
}

impl From<IntegerWidth> for u32 {
    fn from(width: IntegerWidth) -> Self {
        width.bits()
    }
}

/// Alignment policy applied before placing constant fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    None,
    Short,
    Int,
    Long,
}

impl Padding {
    /// Alignment in bytes for an element of `unit_size` bytes.
    /// Single bytes never need padding.
    pub fn alignment(&self, unit_size: usize) -> usize {
        match (self, unit_size) {
            (Padding::None, _) | (_, 1) => 1,
            (Padding::Short, _) => 2,
            (Padding::Int, 2) => 2,
            (Padding::Int, _) => 4,
            (Padding::Long, 2) => 2,
            (Padding::Long, 4) => 4,
            (Padding::Long, _) => 8,
        }
    }

    /// Number of pad bytes needed to bring `offset` to the alignment of `unit_size`
    pub fn pad(&self, offset: usize, unit_size: usize) -> usize {
        let alignment = self.alignment(unit_size);
        (alignment - offset % alignment) % alignment
    }
}
