//! Photo pipeline: decode, detect, normalize, crop, enhance, adjudicate.
//!
//! [`PhotoPipeline`] runs one photo at a time. The detector is optional: when
//! the configuration asks for nothing that needs a face region the photo is
//! passed through untouched and no model has to be loaded.

use std::{io, path::Path};

use cardsheet_utils::{
    EnhancementMode, RgbaColor, config::PhotoSettings, enhance, load_image, timing_guard,
};
use image::{RgbImage, imageops};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{
    detector::FaceDetector,
    error::PipelineError,
    layout::{PHOTO_HEIGHT_MM, PHOTO_WIDTH_MM},
    region::{Rectangle, normalize_region},
    selector::select_first,
};

/// Height over width of a printed card photo.
pub const TARGET_ASPECT: f64 = PHOTO_HEIGHT_MM as f64 / PHOTO_WIDTH_MM as f64;

/// Presenter answer meaning "leave this photo out".
pub const SKIP_CHOICE: usize = 6;

const OVERLAY_THICKNESS: i32 = 2;

/// Per-run photo settings, fixed for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub target_aspect: f64,
    pub crop: bool,
    pub enhancement: Option<EnhancementMode>,
    pub interactive: bool,
    pub debug_overlay: bool,
    pub overlay_color: RgbaColor,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_aspect: TARGET_ASPECT,
            crop: false,
            enhancement: None,
            interactive: false,
            debug_overlay: false,
            overlay_color: RgbaColor::GREEN,
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &PhotoSettings) -> Self {
        Self {
            crop: settings.crop,
            enhancement: settings.enhancement,
            interactive: settings.interactive,
            debug_overlay: settings.debug_overlay,
            overlay_color: settings.overlay_color,
            ..Self::default()
        }
    }

    /// True when any requested step needs a face region.
    pub fn needs_detection(&self) -> bool {
        self.crop || self.enhancement.is_some() || self.interactive || self.debug_overlay
    }
}

/// One candidate image offered to the operator.
#[derive(Debug, Clone)]
pub struct Variant {
    pub label: String,
    pub image: RgbImage,
}

/// Lets a human pick between the computed variants of a photo.
///
/// `Ok(None)` means the answer could not be understood; the pipeline falls
/// back to the plain crop.
pub trait Presenter {
    fn choose(&mut self, variants: &[Variant]) -> io::Result<Option<usize>>;
}

/// What the pipeline produced for one photo.
#[derive(Debug, Clone)]
pub struct PhotoResult {
    /// Image to place on the card.
    pub image: RgbImage,
    /// Normalized crop region of the selected face.
    pub region: Option<Rectangle>,
    /// Original frame with the crop region drawn, when requested.
    pub overlay: Option<RgbImage>,
    /// Number of faces the detector reported.
    pub faces: usize,
}

impl PhotoResult {
    fn passthrough(image: RgbImage, faces: usize) -> Self {
        Self {
            image,
            region: None,
            overlay: None,
            faces,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhotoPipeline {
    config: PipelineConfig,
    detector: Option<FaceDetector>,
}

impl PhotoPipeline {
    /// Fails with [`PipelineError::InvalidConfig`] when the configuration
    /// needs face detection but no detector was supplied.
    pub fn new(config: PipelineConfig, detector: Option<FaceDetector>) -> Result<Self, PipelineError> {
        if config.needs_detection() && detector.is_none() {
            return Err(PipelineError::InvalidConfig(
                "cropping, enhancement, overlays and interactive mode need a face detector".into(),
            ));
        }
        if !(config.target_aspect.is_finite() && config.target_aspect > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "target aspect must be positive, got {}",
                config.target_aspect
            )));
        }
        Ok(Self { config, detector })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode the photo at `path` and run it through the pipeline.
    pub fn process_photo(
        &self,
        path: &Path,
        presenter: Option<&mut dyn Presenter>,
    ) -> Result<PhotoResult, PipelineError> {
        let _guard = timing_guard("cardsheet_core::process_photo", log::Level::Debug);
        let image = load_image(path)
            .map_err(|source| PipelineError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        log::info!(
            "processing {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.process_image(image, presenter)
    }

    /// Run an already decoded photo through the pipeline.
    pub fn process_image(
        &self,
        image: RgbImage,
        presenter: Option<&mut dyn Presenter>,
    ) -> Result<PhotoResult, PipelineError> {
        let Some(detector) = self.detector.as_ref().filter(|_| self.config.needs_detection()) else {
            return Ok(PhotoResult::passthrough(image, 0));
        };

        let gray = imageops::grayscale(&image);
        let faces = detector.detect(&gray).map_err(PipelineError::Detection)?;
        let Some(face) = select_first(&faces) else {
            log::info!("no face found, keeping the photo as is");
            return Ok(PhotoResult::passthrough(image, 0));
        };
        if faces.len() > 1 {
            log::info!("{} faces found, using the first", faces.len());
        }

        let region = normalize_region(face, self.config.target_aspect, image.width(), image.height());
        let overlay = (self.config.debug_overlay || self.config.interactive)
            .then(|| draw_overlay(&image, region, self.config.overlay_color));
        let cropped = crop_region(&image, region);

        let chosen = if self.config.interactive {
            let presenter = presenter.ok_or_else(|| {
                PipelineError::InvalidConfig("interactive mode needs a presenter".into())
            })?;
            let overlay = overlay.clone().unwrap_or_else(|| image.clone());
            adjudicate(presenter, overlay, cropped)?
        } else {
            let base = if self.config.crop { cropped } else { image };
            match self.config.enhancement {
                Some(mode) => enhance(&base, mode),
                None => base,
            }
        };

        Ok(PhotoResult {
            image: chosen,
            region: Some(region),
            overlay: overlay.filter(|_| self.config.debug_overlay),
            faces: faces.len(),
        })
    }
}

/// Cut `region` out of `image`, or keep the full frame when it is empty.
fn crop_region(image: &RgbImage, region: Rectangle) -> RgbImage {
    if region.is_empty() {
        log::warn!("crop region {region:?} is empty, keeping the full frame");
        return image.clone();
    }
    imageops::crop_imm(
        image,
        region.x0 as u32,
        region.y0 as u32,
        region.width() as u32,
        region.height() as u32,
    )
    .to_image()
}

fn draw_overlay(image: &RgbImage, region: Rectangle, color: RgbaColor) -> RgbImage {
    let mut canvas = image.clone();
    for inset in 0..OVERLAY_THICKNESS {
        let width = region.width() - 2 * inset;
        let height = region.height() - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(region.x0 + inset, region.y0 + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(&mut canvas, rect, color.to_rgb());
    }
    canvas
}

fn build_variants(overlay: RgbImage, cropped: RgbImage) -> Vec<Variant> {
    let enhanced: Vec<Variant> = EnhancementMode::ALL
        .into_iter()
        .map(|mode| Variant {
            label: format!("crop + {mode}"),
            image: enhance(&cropped, mode),
        })
        .collect();

    let mut variants = Vec::with_capacity(SKIP_CHOICE);
    variants.push(Variant {
        label: "original".into(),
        image: overlay,
    });
    variants.push(Variant {
        label: "crop".into(),
        image: cropped,
    });
    variants.extend(enhanced);
    variants
}

fn adjudicate(
    presenter: &mut dyn Presenter,
    overlay: RgbImage,
    cropped: RgbImage,
) -> Result<RgbImage, PipelineError> {
    let mut variants = build_variants(overlay, cropped);
    match presenter.choose(&variants)? {
        Some(SKIP_CHOICE) => Err(PipelineError::InteractiveSkip),
        Some(index) if index < variants.len() => {
            log::info!("operator picked variant {index} ({})", variants[index].label);
            Ok(variants.swap_remove(index).image)
        }
        answer => {
            log::warn!("invalid choice {answer:?}, using the plain crop");
            Ok(variants.swap_remove(1).image)
        }
    }
}
