//! Colour types and the colour-space conversions used by the enhancement engine.
//!
//! Luma/chroma conversions follow BT.601 weights. Chroma is kept as `f32` so a
//! round trip that only touches the luma plane does not accumulate rounding in
//! the colour planes.

use serde::{Deserialize, Serialize};

/// Simple RGBA color stored in 8-bit channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RgbaColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl RgbaColor {
    /// Constructs an opaque RGB color.
    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    /// Overlay green used for debug rectangles.
    pub const GREEN: RgbaColor = RgbaColor::opaque(0, 255, 0);

    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.red, self.green, self.blue])
    }
}

impl Default for RgbaColor {
    fn default() -> Self {
        Self::opaque(0, 0, 0)
    }
}

/// Split an RGB pixel into luma (0-255) and the two colour-difference planes.
pub fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let y = 0.299 * rf + 0.587 * gf + 0.114 * bf;
    let u = 0.492 * (bf - y);
    let v = 0.877 * (rf - y);
    (y, u, v)
}

/// Rebuild an RGB pixel from luma and colour-difference planes.
pub fn yuv_to_rgb(y: f32, u: f32, v: f32) -> (u8, u8, u8) {
    let r = y + 1.140 * v;
    let g = y - 0.395 * u - 0.581 * v;
    let b = y + 2.032 * u;
    (to_channel(r), to_channel(g), to_channel(b))
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Convert RGB channels (0-255) to HSV (hue in degrees 0-360, saturation/value 0-1).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let rf = r as f32 / 255.0;
    let gf = g as f32 / 255.0;
    let bf = b as f32 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let hue = if delta.abs() < f32::EPSILON {
        0.0
    } else if (max - rf).abs() < f32::EPSILON {
        60.0 * (((gf - bf) / delta) % 6.0)
    } else if (max - gf).abs() < f32::EPSILON {
        60.0 * (((bf - rf) / delta) + 2.0)
    } else {
        60.0 * (((rf - gf) / delta) + 4.0)
    };

    let hue = if hue < 0.0 { hue + 360.0 } else { hue };
    let saturation = if max.abs() < f32::EPSILON {
        0.0
    } else {
        delta / max
    };
    (hue, saturation, max)
}

/// Convert HSV (hue in degrees, saturation/value 0-1) to RGB channels (0-255).
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    if s <= 0.0 {
        let val = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        return (val, val, val);
    }

    let hue = if h.is_nan() { 0.0 } else { h.rem_euclid(360.0) };
    let c = v * s;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r1, g1, b1) = match hue {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_byte = |value: f32| -> u8 { ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8 };

    (to_byte(r1), to_byte(g1), to_byte(b1))
}

/// Parse a hexadecimal color string. Accepts `#RGB` and `#RRGGBB`, with or without `#`.
pub fn parse_hex_color(input: &str) -> Option<RgbaColor> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    match hex.len() {
        3 => Some(RgbaColor::opaque(
            nibble(hex.get(0..1)?)?,
            nibble(hex.get(1..2)?)?,
            nibble(hex.get(2..3)?)?,
        )),
        6 => Some(RgbaColor::opaque(
            u8::from_str_radix(hex.get(0..2)?, 16).ok()?,
            u8::from_str_radix(hex.get(2..4)?, 16).ok()?,
            u8::from_str_radix(hex.get(4..6)?, 16).ok()?,
        )),
        _ => None,
    }
}

fn nibble(slice: &str) -> Option<u8> {
    let nib = u8::from_str_radix(slice, 16).ok()?;
    Some((nib << 4) | nib)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_has_no_chroma() {
        let (y, u, v) = rgb_to_yuv(90, 90, 90);
        assert!((y - 90.0).abs() < 1e-3);
        assert!(u.abs() < 1e-3);
        assert!(v.abs() < 1e-3);
    }

    #[test]
    fn yuv_round_trip_is_close() {
        for &(r, g, b) in &[(200u8, 40u8, 10u8), (12, 180, 240), (255, 255, 0)] {
            let (y, u, v) = rgb_to_yuv(r, g, b);
            let (r2, g2, b2) = yuv_to_rgb(y, u, v);
            assert!((r as i16 - r2 as i16).abs() <= 2, "red {r} -> {r2}");
            assert!((g as i16 - g2 as i16).abs() <= 2, "green {g} -> {g2}");
            assert!((b as i16 - b2 as i16).abs() <= 2, "blue {b} -> {b2}");
        }
    }

    #[test]
    fn hsv_value_is_max_channel() {
        let (_, _, v) = rgb_to_hsv(30, 200, 90);
        assert_eq!((v * 255.0).round() as u8, 200);
        assert_eq!(hsv_to_rgb(0.0, 0.0, 0.5), (128, 128, 128));
    }

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(parse_hex_color("#0f0"), Some(RgbaColor::GREEN));
        assert_eq!(
            parse_hex_color("ff8000"),
            Some(RgbaColor::opaque(255, 128, 0))
        );
        assert_eq!(parse_hex_color("nope"), None);
    }
}
