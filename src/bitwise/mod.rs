// Definition parsing and element encoding for binary layouts

pub mod elements;
pub mod parser;
pub mod types;

pub use elements::{decode_scalar, encode_scalar};
pub use parser::{parse_definition, Definition, ParseError};
pub use types::{Endianness, IntegerWidth, Padding};
