//! Removal mask raster.
//!
//! Black pixels mean "keep", white pixels mean "remove and regenerate". The
//! buffer always matches the native size of the image it belongs to.

use std::io::Cursor;

use core_types::{BitmapPoint, Dimensions};
use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::draw_filled_circle_mut;

use crate::{EngineError, Result};

/// Brush radius in bitmap pixels.
pub const BRUSH_RADIUS: f64 = 10.0;

const KEEP: Luma<u8> = Luma([0]);
const REMOVE: Luma<u8> = Luma([255]);

#[derive(Debug, Clone)]
pub struct MaskBuffer {
    pixels: GrayImage,
}

/// Lossless PNG snapshot of a mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskEncoding {
    pub dimensions: Dimensions,
    pub bytes: Vec<u8>,
}

impl MaskEncoding {
    pub const MIME: &'static str = "image/png";
    pub const FILE_NAME: &'static str = "mask.png";
}

impl MaskBuffer {
    /// Allocate a fully black mask of exactly `dimensions`.
    pub fn new(dimensions: Dimensions) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(EngineError::EmptyImage);
        }
        Ok(Self {
            pixels: GrayImage::from_pixel(dimensions.width, dimensions.height, KEEP),
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.pixels.dimensions();
        Dimensions::new(width, height)
    }

    /// Fill a white disc of `radius` around `center`.
    ///
    /// Parts of the disc outside the bitmap are clipped. Returns whether the
    /// disc overlapped the bitmap at all.
    pub fn paint_stroke(&mut self, center: BitmapPoint, radius: f64) -> bool {
        if !center.x.is_finite() || !center.y.is_finite() || !radius.is_finite() {
            return false;
        }

        let r = radius.round().max(0.0) as i32;
        let (w, h) = self.pixels.dimensions();
        let (w, h) = (w as i32, h as i32);

        // Keep the centre within one radius of the edges so the drawing code
        // never sees coordinates near i32 overflow. Discs pushed here reach
        // at most one pixel past the border and draw nothing.
        let cx = (center.x.round() as i32).clamp(-r - 1, w + r);
        let cy = (center.y.round() as i32).clamp(-r - 1, h + r);

        let overlaps = cx + r >= 0 && cx - r < w && cy + r >= 0 && cy - r < h;
        if overlaps {
            draw_filled_circle_mut(&mut self.pixels, (cx, cy), r, REMOVE);
        }
        overlaps
    }

    /// Encode the current contents as an 8-bit grayscale PNG.
    pub fn export(&self) -> Result<MaskEncoding> {
        let mut bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| EngineError::Encode(e.to_string()))?;

        tracing::debug!(
            width = self.pixels.width(),
            height = self.pixels.height(),
            painted = self.painted_pixels(),
            bytes = bytes.len(),
            "exported mask"
        );

        Ok(MaskEncoding {
            dimensions: self.dimensions(),
            bytes,
        })
    }

    /// Number of pixels marked for removal.
    pub fn painted_pixels(&self) -> usize {
        self.pixels.as_raw().iter().filter(|&&v| v != 0).count()
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.as_raw().iter().all(|&v| v == 0)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.pixels
    }

    /// Owned copy of the current pixels, unaffected by later strokes.
    pub fn snapshot(&self) -> GrayImage {
        self.pixels.clone()
    }
}
