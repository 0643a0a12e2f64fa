pub mod coords;
pub mod mask;
pub mod source;

use std::path::Path;

pub use coords::map_to_bitmap;
pub use mask::{MaskBuffer, MaskEncoding, BRUSH_RADIUS};
pub use source::SourceImage;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Display geometry is not available yet")]
    LayoutNotReady,
}

pub type Result<T> = std::result::Result<T, EngineError>;

pub struct ImageEngine;

impl Default for ImageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageEngine {
    pub fn new() -> Self {
        Self
    }

    /// Read a file from disk and decode it into a source image.
    pub fn open_source<P: AsRef<Path>>(&self, path: P) -> Result<SourceImage> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        SourceImage::decode(bytes, file_name)
    }

    /// Decode in-memory bytes, e.g. from a drop or file-picker event.
    pub fn decode_source(&self, bytes: Vec<u8>, file_name: Option<String>) -> Result<SourceImage> {
        SourceImage::decode(bytes, file_name)
    }
}
