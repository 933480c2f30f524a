use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, imageops::FilterType};
use ndarray::Array3;

/// Load an image from disk into memory.
///
/// # Arguments
///
/// * `path` - The path to the image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Resize a grayscale frame to the requested resolution using the provided filter.
pub fn resize_gray(image: &GrayImage, width: u32, height: u32, filter: FilterType) -> GrayImage {
    image::imageops::resize(image, width, height, filter)
}

/// Replicate a single luma plane into the three planes of a CHW array.
///
/// Detection backends trained on colour input still accept a gray frame this
/// way.
pub fn gray_to_chw(image: &GrayImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array3::<f32>::zeros((3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = pixel[0] as f32;
        for channel in 0..3 {
            array[(channel, y as usize, x as usize)] = value;
        }
    }
    array
}

/// Compute scale factors used to reproject detections from model space to original space.
///
/// # Arguments
///
/// * `original` - A tuple of the original image's (width, height).
/// * `target` - A tuple of the resized image's (width, height).
pub fn compute_resize_scales(original: (u32, u32), target: (u32, u32)) -> Result<(f32, f32)> {
    let (orig_w, orig_h) = original;
    let (target_w, target_h) = target;
    anyhow::ensure!(
        target_w > 0 && target_h > 0,
        "target dimensions must be non-zero"
    );
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "original dimensions must be non-zero"
    );
    Ok((
        orig_w as f32 / target_w as f32,
        orig_h as f32 / target_h as f32,
    ))
}

/// Number of whole pixels covering `mm` millimetres at `dpi`.
pub fn mm_to_px(mm: f32, dpi: u32) -> u32 {
    (mm / 25.4 * dpi as f32).round().max(0.0) as u32
}
