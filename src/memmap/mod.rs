// Byte storage for layouts
pub mod memory_map;

pub use memory_map::{MemoryMap, MemoryMapError};
