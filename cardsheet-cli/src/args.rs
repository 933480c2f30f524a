//! Command-line argument definitions for cardsheet.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use cardsheet_core::{DelimiterStyle, PrintDirection, PrintMode};
use cardsheet_utils::EnhancementMode;

/// Render printable ID-card sheets from a people CSV and a folder of photos.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct CardsheetArgs {
    /// Folder with the photos to print (defaults to `pictures`).
    #[arg(short = 'i', long = "imgpath", value_name = "DIR")]
    pub image_dir: Option<PathBuf>,

    /// CSV file with people and their details (defaults to `students.csv`).
    #[arg(short = 'p', long = "peoplecsv", value_name = "CSV")]
    pub people_csv: Option<PathBuf>,

    /// Output prefix; all pages are written into `<PREFIX>.pdf`.
    /// Defaults to `output-<mode>`.
    #[arg(short, long, value_name = "PREFIX")]
    pub output: Option<PathBuf>,

    /// What to print: `photo`, `text` or `all`.
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<PrintMode>,

    /// Fill order: `normal` (top to bottom) or `reversed` (bottom to top).
    #[arg(short, long, value_name = "DIRECTION")]
    pub direction: Option<PrintDirection>,

    /// Contrast enhancement: `clahe`, `heq-yuv`, `heq-hsv` or `per-channel`.
    #[arg(short = 'e', long = "equalizehist", value_name = "MODE")]
    pub enhancement: Option<EnhancementMode>,

    /// Crop photos to the detected face.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub crop: bool,

    /// Pick between the original, the crop and every enhancement for each photo.
    #[arg(long, action = ArgAction::SetTrue)]
    pub interactive: bool,

    /// Save every photo with its crop region drawn on it.
    #[arg(long = "debug-overlay", action = ArgAction::SetTrue)]
    pub debug_overlay: bool,

    /// Where overlay images go (defaults to the system temp directory).
    #[arg(long = "debug-dir", value_name = "DIR")]
    pub debug_dir: Option<PathBuf>,

    /// Path to the YuNet ONNX model.
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Optional settings JSON. Defaults to `config/cardsheet.json` when present, otherwise built-in parameters.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// TrueType font for captions and text blocks.
    #[arg(long, value_name = "TTF")]
    pub font: Option<PathBuf>,

    /// Page raster resolution.
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Cut marks between cards: `cross` or `frame`.
    #[arg(long, value_name = "STYLE")]
    pub delimiter: Option<DelimiterStyle>,

    /// Write a JSON report of every person and what happened to their photo.
    #[arg(long, value_name = "JSON")]
    pub report: Option<PathBuf>,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,
}
