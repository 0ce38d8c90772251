// Layout engine: a parsed definition plus the byte buffer it describes

use super::config::{ConfigError, LayoutConfig};
use super::field::Field;
use crate::bitwise::elements::{
    decode_latin1, decode_scalar, encode_latin1, encode_scalar, truncate_at_nul,
};
use crate::bitwise::parser::{parse_definition, Definition, ParseError};
use crate::bitwise::types::{Endianness, IntegerWidth, Padding};
use crate::memmap::MemoryMap;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("undefined label {0}")]
    UndefinedLabel(String),

    #[error("memory offset out of bounds: {label}[{index}]")]
    OutOfBounds { label: String, index: usize },

    #[error("cannot allocate a {0} byte layout")]
    AllocationFailed(usize),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

/// A fixed binary layout built from an assembler-style definition.
///
/// ```text
/// databyte  dc.b  0x17
/// mylong    dc.l  0x1234
/// space     ds.w  20
/// ```
///
/// `dc` declares one element holding a value, `ds` reserves `data`
/// elements. The element type is one of `.b` (1 byte), `.w`/`.s` (2 bytes),
/// `.i` (2 or 4 bytes) and `.l` (2, 4 or 8 bytes) depending on the
/// configured [`IntegerWidth`].
///
/// The field table is fixed once built; only buffer contents change.
#[derive(Debug, Clone)]
pub struct Layout {
    config: LayoutConfig,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    memory: MemoryMap,
}

impl Layout {
    pub fn new(
        definition: &str,
        width: IntegerWidth,
        ordering: Endianness,
        padding: Padding,
    ) -> Result<Self> {
        Self::from_config(definition, &LayoutConfig::new(width, ordering, padding))
    }

    /// Parse `definition`, allocate the buffer and store every constant's
    /// initial value
    pub fn from_config(definition: &str, config: &LayoutConfig) -> Result<Self> {
        let Definition { fields, total_size } =
            parse_definition(definition, config.width, config.padding)?;

        let mut memory = MemoryMap::new_with_size(total_size)
            .map_err(|_| LayoutError::AllocationFailed(total_size))?;
        for field in fields.iter().filter(|f| f.is_constant()) {
            let slot = memory
                .get_mut(field.offset, field.unit_size)
                .map_err(|_| out_of_bounds(&field.label, 0))?;
            encode_scalar(slot, field.count_or_value, config.ordering);
        }

        let index = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.label.clone(), i))
            .collect();

        tracing::debug!(
            "built layout: {} fields, {} bytes, {:?}",
            fields.len(),
            total_size,
            config
        );

        Ok(Self {
            config: *config,
            fields,
            index,
            memory,
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Size of the whole buffer in bytes, padding included
    pub fn size_of(&self) -> usize {
        self.memory.len()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Labels in declaration order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.label.as_str())
    }

    pub fn field(&self, label: &str) -> Result<&Field> {
        self.index
            .get(label)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| LayoutError::UndefinedLabel(label.to_string()))
    }

    pub fn get_offset(&self, label: &str) -> Result<u64> {
        Ok(self.field(label)?.offset as u64)
    }

    /// Size of the field in bytes, padding excluded
    pub fn get_size(&self, label: &str) -> Result<u64> {
        Ok(self.field(label)?.total_size() as u64)
    }

    /// Read a constant. Space fields always read as 0.
    pub fn get(&self, label: &str) -> Result<i64> {
        let field = self.field(label)?;
        if !field.is_constant() {
            return Ok(0);
        }
        self.get_at(label, 0)
    }

    /// Read element `index` of a field. Only the buffer bounds are checked,
    /// so an index may reach into the fields that follow.
    pub fn get_at(&self, label: &str, index: usize) -> Result<i64> {
        let range = self.element(label, index)?;
        let bytes = &self.memory.get_packed()[range];
        Ok(decode_scalar(bytes, self.config.ordering))
    }

    /// Write a constant. Writes to space fields are ignored.
    pub fn set(&mut self, label: &str, value: i64) -> Result<()> {
        let field = self.field(label)?;
        if !field.is_constant() {
            return Ok(());
        }
        self.set_at(label, value, 0)
    }

    /// Write element `index` of a field. Nothing is written when the
    /// element falls outside the buffer.
    pub fn set_at(&mut self, label: &str, value: i64, index: usize) -> Result<()> {
        let range = self.element(label, index)?;
        let ordering = self.config.ordering;
        let slot = self
            .memory
            .get_mut(range.start, range.len())
            .map_err(|_| out_of_bounds(label, index))?;
        encode_scalar(slot, value, ordering);
        Ok(())
    }

    /// The whole buffer
    pub fn get_bytes(&self) -> &[u8] {
        self.memory.get_packed()
    }

    /// Copy `data` into the start of the buffer without resizing it.
    /// Returns the number of bytes copied.
    pub fn set_bytes(&mut self, data: &[u8]) -> usize {
        self.memory.copy_prefix(data)
    }

    /// Field contents as single-byte text, `None` for an empty field
    pub fn get_string(&self, label: &str) -> Result<Option<String>> {
        let range = self.field(label)?.range();
        if range.is_empty() {
            return Ok(None);
        }
        Ok(Some(decode_latin1(&self.memory.get_packed()[range])))
    }

    /// Like [`Layout::get_string`], cut at the first NUL
    pub fn get_c_string(&self, label: &str) -> Result<Option<String>> {
        Ok(self
            .get_string(label)?
            .map(|s| truncate_at_nul(&s).to_string()))
    }

    /// Store `text` at the field, zero padded to the field size and truncated
    /// if longer. Empty text leaves the field untouched. Returns the number
    /// of bytes copied.
    pub fn set_string(&mut self, label: &str, text: &str) -> Result<usize> {
        let range = self.field(label)?.range();
        let bytes = encode_latin1(text);
        let copied = bytes.len().min(range.len());

        if copied > 0 {
            let region = self
                .memory
                .get_mut(range.start, range.len())
                .map_err(|_| out_of_bounds(label, 0))?;
            region.fill(0);
            region[..copied].copy_from_slice(&bytes[..copied]);
        }

        Ok(copied)
    }

    /// Hex dump of the buffer
    pub fn hexdump(&self) -> String {
        self.memory.printable()
    }

    fn element(&self, label: &str, index: usize) -> Result<Range<usize>> {
        let field = self.field(label)?;
        let start = index
            .checked_mul(field.unit_size)
            .and_then(|rel| rel.checked_add(field.offset))
            .filter(|&start| self.memory.get(start, field.unit_size).is_ok());

        match start {
            Some(start) => Ok(start..start + field.unit_size),
            None => {
                tracing::debug!(
                    "{}[{}] is outside the {} byte buffer",
                    label,
                    index,
                    self.memory.len()
                );
                Err(out_of_bounds(label, index))
            }
        }
    }
}

fn out_of_bounds(label: &str, index: usize) -> LayoutError {
    LayoutError::OutOfBounds {
        label: label.to_string(),
        index,
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            let value = if field.is_constant() {
                self.get_at(&field.label, 0).map_err(|_| fmt::Error)?
            } else {
                0
            };
            writeln!(f, "{}", field.describe(value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le16(definition: &str) -> Layout {
        Layout::new(
            definition,
            IntegerWidth::Bits16,
            Endianness::Little,
            Padding::None,
        )
        .unwrap()
    }

    fn size_of(definition: &str, width: IntegerWidth) -> usize {
        Layout::new(definition, width, Endianness::Little, Padding::None)
            .unwrap()
            .size_of()
    }

    fn offset_of_label2(definition: &str, width: IntegerWidth, padding: Padding) -> u64 {
        Layout::new(definition, width, Endianness::Little, padding)
            .unwrap()
            .get_offset("label2")
            .unwrap()
    }

    #[test]
    fn test_scalar_sizes() {
        use IntegerWidth::*;
        assert_eq!(size_of("label dc.b 0", Bits16), 1);
        assert_eq!(size_of("label dc.w 0", Bits16), 2);
        for width in [Bits16, Bits32, Bits64] {
            assert_eq!(size_of("label dc.s 0", width), 2);
        }
        assert_eq!(size_of("label dc.i 0", Bits16), 2);
        assert_eq!(size_of("label dc.i 0", Bits32), 2);
        assert_eq!(size_of("label dc.i 0", Bits64), 4);
        assert_eq!(size_of("label dc.l 0", Bits16), 2);
        assert_eq!(size_of("label dc.l 0", Bits32), 4);
        assert_eq!(size_of("label dc.l 0", Bits64), 8);
    }

    #[test]
    fn test_array_sizes() {
        use IntegerWidth::*;
        assert_eq!(size_of("label ds.b 5", Bits16), 5);
        assert_eq!(size_of("label ds.w 5", Bits16), 10);
        assert_eq!(size_of("label ds.s 5", Bits64), 10);
        assert_eq!(size_of("label ds.i 5", Bits32), 10);
        assert_eq!(size_of("label ds.i 5", Bits64), 20);
        assert_eq!(size_of("label ds.l 5", Bits16), 10);
        assert_eq!(size_of("label ds.l 5", Bits32), 20);
        assert_eq!(size_of("label ds.l 5", Bits64), 40);
        assert_eq!(size_of("label1 dc.b 0\nlabel2 dc.w 0", Bits16), 3);
    }

    #[test]
    fn test_empty_layout() {
        let layout = le16("");
        assert_eq!(layout.size_of(), 0);
        assert!(layout.get_bytes().is_empty());
        assert_eq!(layout.to_string(), "");
    }

    #[test]
    fn test_initial_values() {
        let layout = le16("b dc.b 10\nw dc.w 20\ns dc.s 30\ni dc.i 50000");
        assert_eq!(layout.get("b").unwrap(), 10);
        assert_eq!(layout.get("w").unwrap(), 20);
        assert_eq!(layout.get("s").unwrap(), 30);
        assert_eq!(layout.get("i").unwrap(), 50000);

        let layout = Layout::new(
            "label dc.l 100000",
            IntegerWidth::Bits32,
            Endianness::Little,
            Padding::None,
        )
        .unwrap();
        assert_eq!(layout.get("label").unwrap(), 100000);
    }

    #[test]
    fn test_set_get_constant() {
        let mut layout = le16("b dc.b 10\nw dc.w 20\ni dc.i 50000");
        layout.set("b", 20).unwrap();
        layout.set("w", 30).unwrap();
        layout.set("i", 60000).unwrap();
        assert_eq!(layout.get("b").unwrap(), 20);
        assert_eq!(layout.get("w").unwrap(), 30);
        assert_eq!(layout.get("i").unwrap(), 60000);
    }

    #[test]
    fn test_set_masks_to_width() {
        let mut layout = le16("w dc.w 0");
        layout.set("w", -1).unwrap();
        assert_eq!(layout.get("w").unwrap(), 0xFFFF);

        layout.set("w", 0x1_2345).unwrap();
        assert_eq!(layout.get("w").unwrap(), 0x2345);

        let mut layout = Layout::new(
            "q dc.l 0",
            IntegerWidth::Bits64,
            Endianness::Big,
            Padding::None,
        )
        .unwrap();
        layout.set("q", -2).unwrap();
        assert_eq!(layout.get("q").unwrap(), -2);
    }

    #[test]
    fn test_indexed_arrays() {
        for definition in ["label ds.b 10", "label ds.w 10", "label ds.s 10", "label ds.i 10", "label ds.l 10"] {
            for ordering in [Endianness::Little, Endianness::Big] {
                let mut layout =
                    Layout::new(definition, IntegerWidth::Bits16, ordering, Padding::None).unwrap();
                for i in 0..10 {
                    layout.set_at("label", 20 + i as i64, i).unwrap();
                }
                for i in 0..10 {
                    assert_eq!(layout.get_at("label", i).unwrap(), 20 + i as i64);
                }
            }
        }
    }

    #[test]
    fn test_indexed_byte_order() {
        let mut layout = Layout::new(
            "label ds.w 2",
            IntegerWidth::Bits16,
            Endianness::Big,
            Padding::None,
        )
        .unwrap();
        layout.set_at("label", 0x0102, 1).unwrap();
        assert_eq!(layout.get_bytes(), &[0, 0, 0x01, 0x02]);

        let mut layout = le16("label ds.w 2");
        layout.set_at("label", 0x0102, 1).unwrap();
        assert_eq!(layout.get_bytes(), &[0, 0, 0x02, 0x01]);
    }

    #[test]
    fn test_space_get_set_are_noops() {
        let mut layout = le16("label ds.b 4");
        layout.set_at("label", 9, 0).unwrap();
        layout.set("label", 0x7F).unwrap();
        assert_eq!(layout.get("label").unwrap(), 0);
        assert_eq!(layout.get_bytes(), &[9, 0, 0, 0]);
    }

    #[test]
    fn test_index_may_cross_into_next_field() {
        let mut layout = le16("a ds.b 2\nb dc.b 5");
        assert_eq!(layout.get_at("a", 2).unwrap(), 5);
        layout.set_at("a", 6, 2).unwrap();
        assert_eq!(layout.get("b").unwrap(), 6);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut layout = le16("label ds.b 10");
        assert!(matches!(
            layout.get_at("label", 20),
            Err(LayoutError::OutOfBounds { index: 20, .. })
        ));
        assert!(matches!(
            layout.set_at("label", 1, 10),
            Err(LayoutError::OutOfBounds { .. })
        ));
        assert!(layout.get_at("label", usize::MAX).is_err());
        assert!(layout.get_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_failed_wide_write_leaves_buffer_untouched() {
        let mut layout = le16("pad dc.b 0\nlabel ds.w 1\ntail dc.b 0");
        // element 1 would start at the last byte and run one past the end
        assert!(layout.set_at("label", -1, 1).is_err());
        assert_eq!(layout.get_bytes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_set_string() {
        let mut layout = le16("label ds.b 4");
        assert_eq!(layout.set_string("label", "ABCDEF").unwrap(), 4);
        for (i, &b) in b"ABCD".iter().enumerate() {
            assert_eq!(layout.get_at("label", i).unwrap(), i64::from(b));
        }
    }

    #[test]
    fn test_get_string() {
        let mut layout = le16("label ds.b 10");
        layout.set_string("label", "ABCDEF").unwrap();
        assert_eq!(
            layout.get_string("label").unwrap().as_deref(),
            Some("ABCDEF\0\0\0\0")
        );
    }

    #[test]
    fn test_get_c_string() {
        let mut layout = le16("label ds.b 10");
        layout.set_string("label", "ABCD\0EF").unwrap();
        assert_eq!(layout.get_c_string("label").unwrap().as_deref(), Some("ABCD"));
        assert_eq!(
            layout.get_string("label").unwrap().as_deref(),
            Some("ABCD\0EF\0\0\0")
        );
        assert_eq!(layout.get_bytes(), b"ABCD\0EF\0\0\0");
    }

    #[test]
    fn test_set_string_overwrites_previous_contents() {
        let mut layout = le16("label ds.b 6");
        layout.set_string("label", "ABCDEF").unwrap();
        assert_eq!(layout.set_string("label", "XY").unwrap(), 2);
        assert_eq!(layout.get_bytes(), b"XY\0\0\0\0");

        // empty text is not a write
        assert_eq!(layout.set_string("label", "").unwrap(), 0);
        assert_eq!(layout.get_bytes(), b"XY\0\0\0\0");
    }

    #[test]
    fn test_strings_on_empty_field() {
        let mut layout = le16("label ds.b 0\nnext dc.b 1");
        assert_eq!(layout.get_string("label").unwrap(), None);
        assert_eq!(layout.get_c_string("label").unwrap(), None);
        assert_eq!(layout.set_string("label", "A").unwrap(), 0);
        assert_eq!(layout.get("next").unwrap(), 1);
    }

    #[test]
    fn test_non_ascii_strings() {
        let mut layout = le16("label ds.b 3");
        layout.set_string("label", "\u{e9}\u{20ac}").unwrap();
        assert_eq!(layout.get_bytes(), &[0xE9, b'?', 0]);
        assert_eq!(
            layout.get_c_string("label").unwrap().as_deref(),
            Some("\u{e9}?")
        );
    }

    #[test]
    fn test_set_bytes() {
        let mut layout = le16("label ds.b 4");
        assert_eq!(layout.set_bytes(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(layout.get_bytes(), &[1, 2, 3, 4]);
        assert_eq!(layout.set_bytes(&[9]), 1);
        assert_eq!(layout.get_bytes(), &[9, 2, 3, 4]);
        assert_eq!(layout.size_of(), 4);
    }

    #[test]
    fn test_offset_and_size() {
        let layout = le16("label1 ds.b 10\nlabel2 dc.b 0\nlabel3 ds.w 3");
        assert_eq!(layout.get_offset("label2").unwrap(), 10);
        assert_eq!(layout.get_offset("label3").unwrap(), 11);
        assert_eq!(layout.get_size("label1").unwrap(), 10);
        assert_eq!(layout.get_size("label2").unwrap(), 1);
        assert_eq!(layout.get_size("label3").unwrap(), 6);
    }

    #[test]
    fn test_undefined_label() {
        let mut layout = le16("label ds.b 10");
        let undefined = |r: Result<()>| matches!(r, Err(LayoutError::UndefinedLabel(l)) if l == "nope");

        assert!(undefined(layout.get_offset("nope").map(|_| ())));
        assert!(undefined(layout.get_size("nope").map(|_| ())));
        assert!(undefined(layout.get("nope").map(|_| ())));
        assert!(undefined(layout.get_at("nope", 0).map(|_| ())));
        assert!(undefined(layout.set("nope", 1)));
        assert!(undefined(layout.set_at("nope", 1, 0)));
        assert!(undefined(layout.get_string("nope").map(|_| ())));
        assert!(undefined(layout.get_c_string("nope").map(|_| ())));
        assert!(undefined(layout.set_string("nope", "A").map(|_| ())));
    }

    #[test]
    fn test_byte_ordering() {
        let layout = le16("label dc.w 2000");
        assert_eq!(layout.get_bytes(), &[0xD0, 0x07]);

        let layout = Layout::new(
            "label dc.w 2000",
            IntegerWidth::Bits16,
            Endianness::Big,
            Padding::None,
        )
        .unwrap();
        assert_eq!(layout.get_bytes(), &[0x07, 0xD0]);
        assert_eq!(layout.get("label").unwrap(), 2000);
    }

    #[test]
    fn test_padding() {
        use IntegerWidth::*;
        let word = "label1 dc.b 0\nlabel2 dc.w 0";
        let int = "label1 dc.b 0\nlabel2 dc.i 0";
        let long = "label1 dc.b 0\nlabel2 dc.l 0";

        assert_eq!(offset_of_label2(word, Bits16, Padding::None), 1);
        assert_eq!(offset_of_label2(word, Bits16, Padding::Short), 2);
        assert_eq!(offset_of_label2(word, Bits32, Padding::Int), 2);
        assert_eq!(offset_of_label2(word, Bits64, Padding::Long), 2);
        assert_eq!(offset_of_label2(int, Bits32, Padding::Int), 2);
        assert_eq!(offset_of_label2(int, Bits64, Padding::Long), 4);
        assert_eq!(offset_of_label2(long, Bits32, Padding::Int), 4);
        assert_eq!(offset_of_label2(long, Bits64, Padding::Long), 8);
        assert_eq!(offset_of_label2(long, Bits64, Padding::Int), 4);
        assert_eq!(offset_of_label2(long, Bits64, Padding::Short), 2);
    }

    #[test]
    fn test_padding_counts_towards_size() {
        let layout = Layout::new(
            "a dc.b 1\nb dc.l 2",
            IntegerWidth::Bits64,
            Endianness::Big,
            Padding::Long,
        )
        .unwrap();
        assert_eq!(layout.size_of(), 16);
        assert_eq!(layout.get_bytes()[15], 2);
        assert_eq!(layout.get_size("b").unwrap(), 8);
    }

    #[test]
    fn test_parse_failures_produce_no_layout() {
        let build = |definition| {
            Layout::new(
                definition,
                IntegerWidth::Bits16,
                Endianness::Little,
                Padding::None,
            )
        };

        assert!(matches!(
            build("a dc.b 1\na dc.b 2"),
            Err(LayoutError::Parse(ParseError::DuplicatedLabel(_)))
        ));
        assert!(matches!(
            build("a dc.b"),
            Err(LayoutError::Parse(ParseError::IncompleteDeclaration { .. }))
        ));
        assert!(matches!(
            build("a dq.b 1"),
            Err(LayoutError::Parse(ParseError::InvalidDeclaration(_)))
        ));
        assert!(matches!(
            build("a dc.x 1"),
            Err(LayoutError::Parse(ParseError::InvalidDeclarationType(_)))
        ));
        assert!(matches!(
            build("a dc.b one"),
            Err(LayoutError::Parse(ParseError::InvalidDataValue(_)))
        ));
    }

    #[test]
    fn test_oversized_layouts_fail_without_panicking() {
        let build = |definition, width| {
            Layout::new(definition, width, Endianness::Little, Padding::None)
        };

        assert!(matches!(
            build("a ds.l 0x7fffffffffffffff", IntegerWidth::Bits16),
            Err(LayoutError::Parse(ParseError::SizeOverflow(_)))
        ));
        assert!(matches!(
            build("a ds.b 0x7fffffffffffffff", IntegerWidth::Bits16),
            Err(LayoutError::AllocationFailed(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = LayoutConfig::from_json(
            r#"{"width": 64, "ordering": "big", "padding": "long"}"#,
        )
        .unwrap();
        let layout = Layout::from_config("a dc.b 1\nb dc.i 0x01020304", &config).unwrap();
        assert_eq!(layout.config(), &config);
        assert_eq!(layout.get_bytes(), &[1, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_introspection() {
        let layout = le16("x dc.b 1\ny ds.w 2\nz dc.w 3");
        assert_eq!(layout.labels().collect::<Vec<_>>(), vec!["x", "y", "z"]);
        assert_eq!(layout.fields().len(), 3);
        assert_eq!(layout.field("y").unwrap().unit_size, 2);
        assert!(layout.field("w").is_err());
        assert!(layout.hexdump().starts_with("00000000  01 00"));
    }

    #[test]
    fn test_display() {
        let mut layout = le16("databyte dc.b 0x17\nspace ds.w 20\nword dc.w 0");
        layout.set("word", 1000).unwrap();
        assert_eq!(
            layout.to_string(),
            "[0] size=8 bits, label=databyte, value=23\n\
             [1] size=40 bytes, label=space\n\
             [41] size=16 bits, label=word, value=1000\n"
        );
    }

    #[test]
    fn test_display_reflects_raw_writes() {
        let mut layout = le16("word dc.w 1");
        layout.set_bytes(&[0x34, 0x12]);
        assert_eq!(layout.to_string(), "[0] size=16 bits, label=word, value=4660\n");
    }
}
