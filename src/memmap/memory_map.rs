// Fixed-size byte buffer backing a layout

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryMapError {
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    #[error("Cannot allocate {0} bytes")]
    AllocationFailed(usize),
}

pub type Result<T> = std::result::Result<T, MemoryMapError>;

/// Zero-initialised byte storage. The size is fixed at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryMap {
    data: Vec<u8>,
}

impl MemoryMap {
    /// Create a new memory map with a specific size, filled with zeros.
    /// Fails instead of aborting when the allocation cannot be made.
    pub fn new_with_size(size: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| MemoryMapError::AllocationFailed(size))?;
        data.resize(size, 0u8);
        Ok(Self { data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get @length bytes starting at @start
    pub fn get(&self, start: usize, length: usize) -> Result<&[u8]> {
        let end = self.end_of(start, length)?;
        Ok(&self.data[start..end])
    }

    /// Get a mutable chunk of memory
    pub fn get_mut(&mut self, start: usize, length: usize) -> Result<&mut [u8]> {
        let end = self.end_of(start, length)?;
        Ok(&mut self.data[start..end])
    }

    /// Copy as much of @bytes as fits into the start of the map.
    /// Returns the number of bytes copied.
    pub fn copy_prefix(&mut self, bytes: &[u8]) -> usize {
        let size = bytes.len().min(self.data.len());
        self.data[..size].copy_from_slice(&bytes[..size]);
        size
    }

    /// Get the entire memory map as raw bytes
    pub fn get_packed(&self) -> &[u8] {
        &self.data
    }

    /// Get a printable hex representation of the memory map
    pub fn printable(&self) -> String {
        hexdump(&self.data)
    }

    fn end_of(&self, start: usize, length: usize) -> Result<usize> {
        let end = start
            .checked_add(length)
            .ok_or(MemoryMapError::IndexOutOfBounds(start))?;
        if end > self.data.len() {
            return Err(MemoryMapError::IndexOutOfBounds(end));
        }
        Ok(end)
    }
}

/// Create a hex dump of bytes (similar to hexdump -C)
fn hexdump(data: &[u8]) -> String {
    let mut output = String::new();

    for (i, chunk) in data.chunks(16).enumerate() {
        output.push_str(&format!("{:08x}  ", i * 16));

        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                output.push(' ');
            }
            output.push_str(&format!("{:02x} ", byte));
        }

        // Padding for incomplete lines
        for j in chunk.len()..16 {
            if j == 8 {
                output.push(' ');
            }
            output.push_str("   ");
        }

        output.push_str(" |");
        output.extend(chunk.iter().map(|&b| {
            if (0x20..=0x7e).contains(&b) {
                b as char
            } else {
                '.'
            }
        }));
        output.push_str("|\n");
    }

    output
}
