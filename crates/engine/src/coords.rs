//! Display-space to bitmap-space conversion for pointer input.
//!
//! The mask is authored on the image's native pixel grid, but pointer events
//! arrive in viewport coordinates over a box that is usually scaled down to
//! fit the window. Every paint position goes through [`map_to_bitmap`] so the
//! brush lands under the cursor at any display size.

use core_types::{BitmapPoint, Dimensions, DisplayRect};

use crate::{EngineError, Result};

/// Map a viewport position inside `rect` onto the `bitmap` pixel grid.
///
/// Returns [`EngineError::LayoutNotReady`] while the display box has no usable
/// size. The result is not clamped; painting clips out-of-range positions.
pub fn map_to_bitmap(
    bitmap: Dimensions,
    rect: DisplayRect,
    client_x: f64,
    client_y: f64,
) -> Result<BitmapPoint> {
    if !rect.is_laid_out() || bitmap.is_empty() {
        return Err(EngineError::LayoutNotReady);
    }

    let scale_x = f64::from(bitmap.width) / rect.width;
    let scale_y = f64::from(bitmap.height) / rect.height;

    Ok(BitmapPoint::new(
        (client_x - rect.left) * scale_x,
        (client_y - rect.top) * scale_y,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn maps_downscaled_display_to_native_pixels() {
        let bitmap = Dimensions::new(800, 600);
        let rect = DisplayRect::new(10.0, 10.0, 400.0, 300.0);

        let point = map_to_bitmap(bitmap, rect, 210.0, 160.0).expect("laid out");
        assert!((point.x - 400.0).abs() < EPSILON);
        assert!((point.y - 300.0).abs() < EPSILON);
    }

    #[test]
    fn doubling_display_width_halves_x() {
        let bitmap = Dimensions::new(1024, 768);
        for (offset, width) in [(37.5, 256.0), (100.0, 333.0), (1.0, 1024.0)] {
            let narrow = DisplayRect::new(20.0, 0.0, width, 200.0);
            let wide = DisplayRect::new(20.0, 0.0, width * 2.0, 200.0);

            let a = map_to_bitmap(bitmap, narrow, 20.0 + offset, 50.0).unwrap();
            let b = map_to_bitmap(bitmap, wide, 20.0 + offset, 50.0).unwrap();

            assert!((a.x / 2.0 - b.x).abs() < 1e-6, "{a:?} vs {b:?}");
            assert!((a.y - b.y).abs() < EPSILON);
        }
    }

    #[test]
    fn native_size_display_is_identity() {
        let bitmap = Dimensions::new(640, 480);
        let rect = DisplayRect::sized(640.0, 480.0);

        let point = map_to_bitmap(bitmap, rect, 12.0, 470.0).unwrap();
        assert_eq!(point, BitmapPoint::new(12.0, 470.0));
    }

    #[test]
    fn positions_outside_the_box_are_not_clamped() {
        let bitmap = Dimensions::new(200, 100);
        let rect = DisplayRect::new(50.0, 50.0, 100.0, 50.0);

        let point = map_to_bitmap(bitmap, rect, 40.0, 120.0).unwrap();
        assert!((point.x + 20.0).abs() < EPSILON);
        assert!((point.y - 140.0).abs() < EPSILON);
    }

    #[test]
    fn zero_sized_layout_is_not_ready() {
        let bitmap = Dimensions::new(800, 600);

        for rect in [
            DisplayRect::new(0.0, 0.0, 0.0, 300.0),
            DisplayRect::new(0.0, 0.0, 400.0, 0.0),
            DisplayRect::new(0.0, 0.0, f64::NAN, 300.0),
        ] {
            let err = map_to_bitmap(bitmap, rect, 10.0, 10.0).unwrap_err();
            assert!(matches!(err, EngineError::LayoutNotReady));
        }
    }
}
