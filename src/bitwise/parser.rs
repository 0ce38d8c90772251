// Definition parser for `label dc|ds.<type> data` layouts
//
// The definition is a whitespace separated stream of triples. Constant
// (`dc`) fields are aligned according to the padding mode before being
// placed; space (`ds`) fields are packed at the current offset.

use super::types::{IntegerWidth, Padding};
use crate::core::field::{Field, FieldKind};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{digit1, hex_digit1, one_of},
    combinator::{all_consuming, map_res, opt},
    sequence::preceded,
    IResult, Parser,
};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed declaration: {label} is missing its statement or data")]
    IncompleteDeclaration { label: String },

    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("invalid declaration type: {0}")]
    InvalidDeclarationType(String),

    #[error("invalid data value: {0}")]
    InvalidDataValue(String),

    #[error("duplicated label: {0}")]
    DuplicatedLabel(String),

    #[error("invalid repeat count {count} for {label}")]
    InvalidCount { label: String, count: i64 },

    #[error("layout size overflow at {0}")]
    SizeOverflow(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Largest buffer a layout may describe; allocations are limited to `isize::MAX` bytes
pub const MAX_LAYOUT_SIZE: usize = isize::MAX as usize;

/// Output of a successful parse: fields in declaration order and the total size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub fields: Vec<Field>,
    pub total_size: usize,
}

/// Parse a layout definition into placed fields.
///
/// Fails on the first bad declaration; nothing is returned for a partially
/// parsed definition.
pub fn parse_definition(text: &str, width: IntegerWidth, padding: Padding) -> Result<Definition> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut fields = Vec::with_capacity(tokens.len() / 3);
    let mut seen = HashSet::new();
    let mut offset: usize = 0;

    for chunk in tokens.chunks(3) {
        let &[label, statement, data] = chunk else {
            return Err(ParseError::IncompleteDeclaration {
                label: chunk[0].to_string(),
            });
        };

        let (kind, unit_size) = parse_statement(statement, width)?;
        let value = parse_data_value(data)?;

        if !seen.insert(label) {
            return Err(ParseError::DuplicatedLabel(label.to_string()));
        }

        let overflow = || ParseError::SizeOverflow(label.to_string());
        let advance = match kind {
            FieldKind::Constant => {
                let pad = padding.pad(offset, unit_size);
                offset = offset.checked_add(pad).ok_or_else(overflow)?;
                unit_size
            }
            FieldKind::Space => {
                let count = usize::try_from(value).map_err(|_| ParseError::InvalidCount {
                    label: label.to_string(),
                    count: value,
                })?;
                unit_size.checked_mul(count).ok_or_else(overflow)?
            }
        };

        tracing::trace!(
            "placed {} at offset {} ({:?}, {} byte units, {} bytes)",
            label,
            offset,
            kind,
            unit_size,
            advance
        );

        fields.push(Field {
            label: label.to_string(),
            kind,
            unit_size,
            offset,
            count_or_value: value,
        });

        offset = offset
            .checked_add(advance)
            .filter(|&end| end <= MAX_LAYOUT_SIZE)
            .ok_or_else(overflow)?;
    }

    Ok(Definition {
        fields,
        total_size: offset,
    })
}

/// Classify a statement token such as `dc.w` or `ds.l`
pub fn parse_statement(statement: &str, width: IntegerWidth) -> Result<(FieldKind, usize)> {
    let kind = if statement.starts_with("dc") {
        FieldKind::Constant
    } else if statement.starts_with("ds") {
        FieldKind::Space
    } else {
        return Err(ParseError::InvalidDeclaration(statement.to_string()));
    };

    let unit_size = if statement.ends_with(".b") {
        1
    } else if statement.ends_with(".w") || statement.ends_with(".s") {
        2
    } else if statement.ends_with(".i") {
        width.int_size()
    } else if statement.ends_with(".l") {
        width.long_size()
    } else {
        return Err(ParseError::InvalidDeclarationType(statement.to_string()));
    };

    Ok((kind, unit_size))
}

/// Parse a data literal: decimal, `0x`/`0X`/`#` hex or leading-zero octal,
/// with an optional sign
pub fn parse_data_value(data: &str) -> Result<i64> {
    let invalid = || ParseError::InvalidDataValue(data.to_string());

    let (_, (sign, magnitude)) = all_consuming(integer_literal)
        .parse(data)
        .map_err(|_| invalid())?;

    let signed = match sign {
        Some('-') => -i128::from(magnitude),
        _ => i128::from(magnitude),
    };
    i64::try_from(signed).map_err(|_| invalid())
}

fn integer_literal(input: &str) -> IResult<&str, (Option<char>, u64)> {
    let (input, sign) = opt(one_of("+-")).parse(input)?;
    let (input, magnitude) = alt((
        map_res(
            preceded(alt((tag("0x"), tag("0X"), tag("#"))), hex_digit1),
            |digits: &str| u64::from_str_radix(digits, 16),
        ),
        map_res(digit1, |digits: &str| {
            if digits.len() > 1 && digits.starts_with('0') {
                u64::from_str_radix(&digits[1..], 8)
            } else {
                digits.parse::<u64>()
            }
        }),
    ))
    .parse(input)?;
    Ok((input, (sign, magnitude)))
}
