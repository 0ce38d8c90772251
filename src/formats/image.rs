// Definition and raw image files for layouts

use crate::core::layout::{Layout, LayoutError};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// Read a layout definition from a text file
pub fn load_definition(filename: impl AsRef<Path>) -> Result<String> {
    Ok(fs::read_to_string(filename)?)
}

/// Write the layout buffer to a file as raw bytes
pub fn save_image(filename: impl AsRef<Path>, layout: &Layout) -> Result<()> {
    fs::write(filename, layout.get_bytes())?;
    Ok(())
}

/// Load raw bytes from a file into the start of the layout buffer.
/// Returns the number of bytes copied; the layout is never resized.
pub fn load_image(filename: impl AsRef<Path>, layout: &mut Layout) -> Result<usize> {
    let filename = filename.as_ref();
    let data = fs::read(filename)?;
    let copied = layout.set_bytes(&data);

    if copied != data.len() || copied != layout.size_of() {
        tracing::warn!(
            "{} holds {} bytes, layout is {} bytes; copied {}",
            filename.display(),
            data.len(),
            layout.size_of(),
            copied
        );
    }

    Ok(copied)
}
