// Core module containing the layout engine and its data structures
pub mod config;
pub mod field;
pub mod layout;

// Re-export commonly used types
pub use config::{ConfigError, LayoutConfig};
pub use field::{Field, FieldKind};
pub use layout::{Layout, LayoutError};
