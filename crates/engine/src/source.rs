use std::sync::Arc;

use core_types::{Dimensions, DisplayRect};

use crate::{EngineError, Result};

/// The photograph being edited.
///
/// Holds the untouched file bytes for upload next to the decoded native size.
/// Only the display box changes after construction.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Arc<[u8]>,
    file_name: String,
    mime: &'static str,
    dimensions: Dimensions,
    display: Option<DisplayRect>,
}

impl SourceImage {
    /// Decode `bytes`, rejecting anything the image codecs cannot read.
    pub fn decode(bytes: Vec<u8>, file_name: Option<String>) -> Result<Self> {
        let format = image::guess_format(&bytes)
            .map_err(|e| EngineError::Decode(format!("unrecognized image data: {e}")))?;
        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| EngineError::Decode(e.to_string()))?;

        let dimensions = Dimensions::new(decoded.width(), decoded.height());
        if dimensions.is_empty() {
            return Err(EngineError::EmptyImage);
        }

        let file_name = file_name.unwrap_or_else(|| {
            let ext = format.extensions_str().first().copied().unwrap_or("img");
            format!("image.{ext}")
        });

        tracing::debug!(
            file = %file_name,
            width = dimensions.width,
            height = dimensions.height,
            "decoded source image"
        );

        Ok(Self {
            bytes: Arc::from(bytes),
            file_name,
            mime: format.to_mime_type(),
            dimensions,
            display: None,
        })
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        self.bytes.clone()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Current on-screen box, if the collaborator reported one.
    pub fn display(&self) -> Option<DisplayRect> {
        self.display
    }

    pub fn display_width(&self) -> Option<f64> {
        self.display.map(|rect| rect.width)
    }

    pub fn display_height(&self) -> Option<f64> {
        self.display.map(|rect| rect.height)
    }

    /// Record a new display box. Returns true if it differs from the last one.
    pub fn set_display(&mut self, rect: DisplayRect) -> bool {
        if self.display == Some(rect) {
            return false;
        }
        self.display = Some(rect);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn decode_reads_native_dimensions() {
        let source = SourceImage::decode(png_bytes(80, 60), Some("beach.png".into())).unwrap();

        assert_eq!(source.dimensions(), Dimensions::new(80, 60));
        assert_eq!(source.file_name(), "beach.png");
        assert_eq!(source.mime(), "image/png");
        assert!(source.display().is_none());
        assert_eq!(&source.bytes()[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn decode_derives_file_name_from_format() {
        let source = SourceImage::decode(png_bytes(4, 4), None).unwrap();
        assert_eq!(source.file_name(), "image.png");
    }

    #[test]
    fn decode_rejects_non_images() {
        let err = SourceImage::decode(b"definitely not pixels".to_vec(), None).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn decode_rejects_truncated_files() {
        let mut bytes = png_bytes(16, 16);
        bytes.truncate(30);
        let err = SourceImage::decode(bytes, None).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn set_display_reports_changes() {
        let mut source = SourceImage::decode(png_bytes(8, 8), None).unwrap();
        let rect = DisplayRect::new(0.0, 0.0, 4.0, 4.0);

        assert!(source.set_display(rect));
        assert!(!source.set_display(rect));
        assert_eq!(source.display_width(), Some(4.0));
        assert_eq!(source.display_height(), Some(4.0));
    }
}
