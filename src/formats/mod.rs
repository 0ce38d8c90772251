// File handlers for definitions and layout images
pub mod image;

pub use image::{load_definition, load_image, save_image, ImageError};
