//! Turning a raw face box into a printable crop region.
//!
//! A raw detector box hugs the face. The crop for an ID photo needs room for hair
//! and shoulders and a fixed height/width ratio, so every box goes through the
//! same chain of pure steps:
//!
//! 1. [`expand`]: grow by half the size, keeping the centre.
//! 2. [`correct_aspect`]: set `height = floor(width * ratio)`.
//! 3. [`recenter`]: shift up by an eighth of the height so the face sits high.
//! 4. [`repair_origin`]: shift a box with a negative origin inward to zero,
//!    keeping its size.
//! 5. [`RawBox::to_corners`]: switch to half-open corner form.
//! 6. [`Rectangle::clip`]: clamp the far corner to the image.
//!
//! ```
//! use cardsheet_core::region::{RawBox, Rectangle, normalize_region};
//!
//! let rect = normalize_region(RawBox::new(100, 100, 100, 100), 1.370, 640, 480);
//! assert_eq!(rect, Rectangle::new(75, 50, 225, 255));
//! ```

use serde::Serialize;

/// Candidate box as reported by the classifier: origin plus size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RawBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn to_corners(self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// Half-open rectangle `[x0, x1) x [y0, y1)` in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rectangle {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }

    /// True when the rectangle covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Clamp the far corner to an image of `width x height` pixels.
    pub fn clip(self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.min(width.min(i32::MAX as u32) as i32),
            y1: self.y1.min(height.min(i32::MAX as u32) as i32),
            ..self
        }
    }
}

/// Grow the box by half its size around the same centre.
pub fn expand(raw: RawBox) -> RawBox {
    RawBox {
        x: raw.x - raw.width / 4,
        y: raw.y - raw.height / 4,
        width: raw.width + raw.width / 2,
        height: raw.height + raw.height / 2,
    }
}

/// Replace the height with `floor(width * ratio)`.
pub fn correct_aspect(raw: RawBox, ratio: f64) -> RawBox {
    RawBox {
        height: (raw.width as f64 * ratio).floor() as i32,
        ..raw
    }
}

/// Move the box up by an eighth of its height.
pub fn recenter(raw: RawBox) -> RawBox {
    RawBox {
        y: raw.y - raw.height / 8,
        ..raw
    }
}

/// Shift a box that starts left of or above the image inward so its origin
/// is zero. Width and height are unchanged, so the aspect ratio survives.
pub fn repair_origin(raw: RawBox) -> RawBox {
    RawBox {
        x: raw.x.max(0),
        y: raw.y.max(0),
        ..raw
    }
}

/// Run the whole chain for one raw box.
///
/// The result may be empty when the box lies outside the image; check
/// [`Rectangle::is_empty`] before cropping.
pub fn normalize_region(raw: RawBox, ratio: f64, image_width: u32, image_height: u32) -> Rectangle {
    let expanded = expand(raw);
    let corrected = correct_aspect(expanded, ratio);
    let recentered = recenter(corrected);
    let repaired = repair_origin(recentered);
    let rect = repaired.to_corners().clip(image_width, image_height);
    log::debug!("normalized {raw:?} -> {rect:?}");
    rect
}
