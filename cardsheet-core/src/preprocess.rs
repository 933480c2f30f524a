//! Turning an equalized grayscale frame into a YuNet input tensor.
//!
//! The frame is resized to the model input, replicated into three planes and
//! laid out as `[1, 3, H, W]`. The scale factors needed to map detections back
//! onto the source frame travel with the tensor.

use std::borrow::Cow;

use anyhow::Result;
use cardsheet_utils::{
    compute_resize_scales,
    config::{InputDimensions, ResizeQuality},
    gray_to_chw, resize_gray, timing_guard,
};
use image::{GrayImage, imageops::FilterType};
use tract_onnx::prelude::Tensor;

/// Desired input resolution for YuNet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::new(640, 640)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    pub input_size: InputSize,
    pub resize_quality: ResizeQuality,
}

impl PreprocessConfig {
    fn resize_filter(&self) -> FilterType {
        match self.resize_quality {
            ResizeQuality::Quality => FilterType::Triangle,
            ResizeQuality::Speed => FilterType::Nearest,
        }
    }
}

/// Tensor plus what is needed to rescale detections.
#[derive(Debug)]
pub struct PreprocessOutput {
    pub tensor: Tensor,
    pub scale_x: f32,
    pub scale_y: f32,
    pub original_size: (u32, u32),
}

impl From<&InputDimensions> for PreprocessConfig {
    fn from(dimensions: &InputDimensions) -> Self {
        PreprocessConfig {
            input_size: InputSize::new(dimensions.width, dimensions.height),
            resize_quality: dimensions.resize_quality,
        }
    }
}

/// Build the model input for `frame`.
pub fn preprocess_gray(frame: &GrayImage, config: &PreprocessConfig) -> Result<PreprocessOutput> {
    let _guard = timing_guard("cardsheet_core::preprocess", log::Level::Trace);
    let InputSize {
        width: input_w,
        height: input_h,
    } = config.input_size;
    let (orig_w, orig_h) = frame.dimensions();
    let (scale_x, scale_y) = compute_resize_scales((orig_w, orig_h), (input_w, input_h))?;

    let resized: Cow<'_, GrayImage> = if (orig_w, orig_h) == (input_w, input_h) {
        Cow::Borrowed(frame)
    } else {
        Cow::Owned(resize_gray(frame, input_w, input_h, config.resize_filter()))
    };

    let shape = [1usize, 3, input_h as usize, input_w as usize];
    let (data, _) = gray_to_chw(&resized).into_raw_vec_and_offset();
    let tensor = Tensor::from_shape(&shape, &data)
        .map_err(|e| anyhow::anyhow!("failed to build tensor: {e}"))?;

    Ok(PreprocessOutput {
        tensor,
        scale_x,
        scale_y,
        original_size: (orig_w, orig_h),
    })
}
