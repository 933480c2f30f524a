//! Common helpers shared across the cardsheet crates.

/// Colour types plus RGB/YUV/HSV conversions.
pub mod color;
/// Run settings loaded from JSON.
pub mod config;
/// Contrast enhancement modes for face crops.
pub mod enhance;
/// Histograms, equalization tables and CLAHE.
pub mod histogram;
/// Image loading, resizing, and tensor conversion.
pub mod image_utils;
/// People CSV parsing.
pub mod records;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::LevelFilter;

pub use color::{RgbaColor, parse_hex_color};
pub use enhance::{EnhancementMode, enhance};
pub use histogram::{Clahe, equalize_gray};
pub use image_utils::{compute_resize_scales, gray_to_chw, load_image, mm_to_px, resize_gray};
pub use records::{PersonRecord, load_people};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    timing_guard,
};

/// Initialize logging once.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. Telemetry
/// records are always let through so `--telemetry` works without touching
/// `RUST_LOG`.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
