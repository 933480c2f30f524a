//! Photo enhancement modes applied to the face crop.
//!
//! Every mode maps an RGB image to a new RGB image of the same dimensions.
//! The input is never modified.

use std::{fmt, str::FromStr};

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::{
    color::{hsv_to_rgb, rgb_to_hsv, rgb_to_yuv, yuv_to_rgb},
    histogram::{Clahe, apply_lut, cumulative_rescale_lut, equalization_lut, histogram},
};

/// Contrast enhancement strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EnhancementMode {
    /// CLAHE on the luma plane (clip 2.0, 2x2 tiles).
    #[serde(rename = "clahe", alias = "clache")]
    AdaptiveLocal,
    /// Global equalization of the luma plane.
    #[serde(rename = "heq-yuv")]
    GlobalLuma,
    /// Global equalization of the HSV value plane.
    #[serde(rename = "heq-hsv")]
    GlobalValue,
    /// Cumulative rescale of each RGB channel independently.
    #[serde(rename = "per-channel")]
    GlobalPerChannel,
}

impl EnhancementMode {
    /// All modes in the order interactive adjudication presents them.
    pub const ALL: [EnhancementMode; 4] = [
        EnhancementMode::AdaptiveLocal,
        EnhancementMode::GlobalLuma,
        EnhancementMode::GlobalValue,
        EnhancementMode::GlobalPerChannel,
    ];
}

impl fmt::Display for EnhancementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnhancementMode::AdaptiveLocal => "clahe",
            EnhancementMode::GlobalLuma => "heq-yuv",
            EnhancementMode::GlobalValue => "heq-hsv",
            EnhancementMode::GlobalPerChannel => "per-channel",
        })
    }
}

impl FromStr for EnhancementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "clahe" | "clache" | "adaptive-local" => Ok(EnhancementMode::AdaptiveLocal),
            "heq-yuv" | "global-luma" => Ok(EnhancementMode::GlobalLuma),
            "heq-hsv" | "global-value" => Ok(EnhancementMode::GlobalValue),
            "per-channel" | "other" | "global-per-channel" => {
                Ok(EnhancementMode::GlobalPerChannel)
            }
            other => Err(format!(
                "invalid enhancement mode '{other}'; expected clahe, heq-yuv, heq-hsv or per-channel"
            )),
        }
    }
}

/// Apply `mode` to `image` and return the enhanced copy.
pub fn enhance(image: &RgbImage, mode: EnhancementMode) -> RgbImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    match mode {
        EnhancementMode::AdaptiveLocal => {
            equalize_luma(image, |luma| Clahe::default().apply(luma))
        }
        EnhancementMode::GlobalLuma => equalize_luma(image, |luma| {
            let hist = histogram(luma.pixels().map(|p| p.0[0]));
            apply_lut(luma, &equalization_lut(&hist))
        }),
        EnhancementMode::GlobalValue => equalize_value(image),
        EnhancementMode::GlobalPerChannel => equalize_per_channel(image),
    }
}

/// Run `equalize` on the luma plane and rebuild RGB with the original chroma.
fn equalize_luma<F>(image: &RgbImage, equalize: F) -> RgbImage
where
    F: FnOnce(&GrayImage) -> GrayImage,
{
    let (width, height) = image.dimensions();
    let mut chroma = Vec::with_capacity((width * height) as usize);
    let mut luma = GrayImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels() {
        let (yv, u, v) = rgb_to_yuv(pixel[0], pixel[1], pixel[2]);
        chroma.push((u, v));
        luma.put_pixel(x, y, image::Luma([yv.round().clamp(0.0, 255.0) as u8]));
    }

    let luma = equalize(&luma);
    let mut out = RgbImage::new(width, height);
    for ((x, y, pixel), (u, v)) in out.enumerate_pixels_mut().zip(chroma) {
        let (r, g, b) = yuv_to_rgb(luma.get_pixel(x, y).0[0] as f32, u, v);
        *pixel = image::Rgb([r, g, b]);
    }
    out
}

fn equalize_value(image: &RgbImage) -> RgbImage {
    let hsv: Vec<(f32, f32, u8)> = image
        .pixels()
        .map(|p| {
            let (h, s, v) = rgb_to_hsv(p[0], p[1], p[2]);
            (h, s, (v * 255.0).round() as u8)
        })
        .collect();
    let lut = equalization_lut(&histogram(hsv.iter().map(|&(_, _, v)| v)));

    let mut out = RgbImage::new(image.width(), image.height());
    for (pixel, (h, s, v)) in out.pixels_mut().zip(hsv) {
        let (r, g, b) = hsv_to_rgb(h, s, lut[v as usize] as f32 / 255.0);
        *pixel = image::Rgb([r, g, b]);
    }
    out
}

fn equalize_per_channel(image: &RgbImage) -> RgbImage {
    let luts: Vec<_> = (0..3)
        .map(|c| cumulative_rescale_lut(&histogram(image.pixels().map(|p| p[c]))))
        .collect();
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for (c, lut) in luts.iter().enumerate() {
            pixel[c] = lut[pixel[c] as usize];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn two_tone() -> RgbImage {
        let mut img = RgbImage::new(8, 2);
        for y in 0..2 {
            for x in 0..4 {
                img.put_pixel(x, y, Rgb([40, 80, 120]));
            }
            for x in 4..8 {
                img.put_pixel(x, y, Rgb([200, 160, 100]));
            }
        }
        img
    }

    #[test]
    fn every_mode_preserves_dimensions() {
        let img = two_tone();
        for mode in EnhancementMode::ALL {
            let out = enhance(&img, mode);
            assert_eq!(out.dimensions(), img.dimensions(), "mode {mode}");
        }
    }

    #[test]
    fn input_is_left_untouched() {
        let img = two_tone();
        let before = img.clone();
        for mode in EnhancementMode::ALL {
            let _ = enhance(&img, mode);
        }
        assert_eq!(img, before);
    }

    #[test]
    fn per_channel_stretches_each_channel() {
        let out = enhance(&two_tone(), EnhancementMode::GlobalPerChannel);
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(out.get_pixel(7, 0), &Rgb([255, 255, 0]));
    }

    #[test]
    fn per_channel_leaves_flat_image_unchanged() {
        let img = RgbImage::from_pixel(4, 4, Rgb([12, 34, 56]));
        assert_eq!(enhance(&img, EnhancementMode::GlobalPerChannel), img);
    }

    #[test]
    fn global_value_spreads_brightness() {
        let out = enhance(&two_tone(), EnhancementMode::GlobalValue);
        let dark = out.get_pixel(0, 0);
        let bright = out.get_pixel(7, 0);
        assert_eq!(dark[0].max(dark[1]).max(dark[2]), 0);
        assert_eq!(bright[0].max(bright[1]).max(bright[2]), 255);
    }

    #[test]
    fn global_luma_keeps_gray_pixels_gray() {
        let mut img = RgbImage::new(4, 1);
        img.put_pixel(0, 0, Rgb([60, 60, 60]));
        img.put_pixel(1, 0, Rgb([60, 60, 60]));
        img.put_pixel(2, 0, Rgb([90, 90, 90]));
        img.put_pixel(3, 0, Rgb([90, 90, 90]));
        let out = enhance(&img, EnhancementMode::GlobalLuma);
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(3, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn empty_image_passes_through() {
        let img = RgbImage::new(0, 0);
        assert_eq!(enhance(&img, EnhancementMode::AdaptiveLocal).dimensions(), (0, 0));
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("clahe".parse::<EnhancementMode>(), Ok(EnhancementMode::AdaptiveLocal));
        assert_eq!("clache".parse::<EnhancementMode>(), Ok(EnhancementMode::AdaptiveLocal));
        assert_eq!("HEQ_YUV".parse::<EnhancementMode>(), Ok(EnhancementMode::GlobalLuma));
        assert_eq!("heq-hsv".parse::<EnhancementMode>(), Ok(EnhancementMode::GlobalValue));
        assert_eq!("per-channel".parse::<EnhancementMode>(), Ok(EnhancementMode::GlobalPerChannel));
        assert!("sharpen".parse::<EnhancementMode>().is_err());
        assert_eq!(EnhancementMode::GlobalLuma.to_string(), "heq-yuv");
    }
}
