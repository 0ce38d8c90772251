// MEMSTRUCT: fixed binary memory layouts from assembler-style definitions

pub mod bitwise;
pub mod core;
pub mod formats;
pub mod memmap;

// Re-export commonly used types
pub use crate::bitwise::{Endianness, IntegerWidth, Padding, ParseError};
pub use crate::core::{ConfigError, Field, FieldKind, Layout, LayoutConfig, LayoutError};
pub use crate::formats::{load_definition, load_image, save_image, ImageError};
pub use crate::memmap::MemoryMap;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
