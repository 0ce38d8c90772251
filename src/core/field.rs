// Field descriptors produced by the definition parser

use serde::{Deserialize, Serialize};

/// Declaration kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// `dc`: a single element holding a value
    Constant,
    /// `ds`: a block of repeated elements
    Space,
}

/// One placed declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub label: String,
    pub kind: FieldKind,

    /// Byte width of one element (1, 2, 4 or 8)
    pub unit_size: usize,

    /// Byte offset within the layout buffer
    pub offset: usize,

    /// Initial value for constants, element count for spaces
    pub count_or_value: i64,
}

impl Field {
    pub fn is_constant(&self) -> bool {
        self.kind == FieldKind::Constant
    }

    /// Total byte size of the field, padding excluded
    pub fn total_size(&self) -> usize {
        match self.kind {
            FieldKind::Constant => self.unit_size,
            FieldKind::Space => self.unit_size * self.count_or_value.max(0) as usize,
        }
    }

    /// Byte range covered by the field inside the buffer
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.total_size()
    }

    /// One line of the layout dump. `value` is the current value of a
    /// constant; it is ignored for spaces.
    pub fn describe(&self, value: i64) -> String {
        match self.kind {
            FieldKind::Constant => format!(
                "[{}] size={} bits, label={}, value={}",
                self.offset,
                self.unit_size * 8,
                self.label,
                value
            ),
            FieldKind::Space => format!(
                "[{}] size={} bytes, label={}",
                self.offset,
                self.total_size(),
                self.label
            ),
        }
    }
}
