//! Settings shared by the pipeline, the sheet renderer and the CLI.
//!
//! Every section deserializes with `#[serde(default)]`, so a settings file only
//! needs the keys it wants to change.

use crate::{color::RgbaColor, enhance::EnhancementMode};

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

pub const DEFAULT_MODEL_PATH: &str = "models/face_detection_yunet_2023mar_640.onnx";

/// Detector tuning. `min_neighbors` and `min_size` gate which faces count as found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum confidence score for a candidate to be kept.
    pub score_threshold: f32,
    /// IoU above which overlapping candidates are merged.
    pub nms_threshold: f32,
    /// Maximum number of candidates considered after sorting.
    pub top_k: usize,
    /// Neighbour votes a face needs, counted at the density of a multi-scale
    /// search with `scale_step` between scales. See [`Self::anchor_votes`].
    pub min_neighbors: usize,
    /// Scale step the `min_neighbors` count refers to.
    pub scale_step: f32,
    /// Smallest accepted face side, in source pixels.
    pub min_size: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            score_threshold: 0.6,
            nms_threshold: 0.3,
            top_k: 5_000,
            min_neighbors: 50,
            scale_step: 1.01,
            min_size: 100,
        }
    }
}

impl DetectionSettings {
    /// `min_neighbors` converted to overlapping anchor votes.
    ///
    /// A search with step `s` visits `ln 2 / ln s` scales per octave, while the
    /// anchor detector has one stride per octave, so the count shrinks by that
    /// factor. At least one vote is always required.
    pub fn anchor_votes(&self) -> usize {
        if self.scale_step <= 1.0 || !self.scale_step.is_finite() {
            return self.min_neighbors.max(1);
        }
        let scales_per_octave = (2.0_f64).ln() / (self.scale_step as f64).ln();
        let votes = (self.min_neighbors as f64 / scales_per_octave.max(1.0)).ceil();
        (votes as usize).max(1)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Triangle filter.
    #[default]
    Quality,
    /// Nearest filter.
    Speed,
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResizeQuality::Quality => "quality",
            ResizeQuality::Speed => "speed",
        })
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(ResizeQuality::Quality),
            "speed" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// Inference input resolution in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDimensions {
    pub width: u32,
    pub height: u32,
    pub resize_quality: ResizeQuality,
}

impl Default for InputDimensions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            resize_quality: ResizeQuality::Quality,
        }
    }
}

/// What each photo goes through before it is placed on the sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhotoSettings {
    /// Crop the photo to the normalized face region.
    pub crop: bool,
    /// Contrast enhancement applied to the (cropped) photo.
    pub enhancement: Option<EnhancementMode>,
    /// Ask an operator to pick between the computed variants.
    pub interactive: bool,
    /// Save the full frame with the crop region drawn on it.
    pub debug_overlay: bool,
    /// Where overlays are written; the system temp directory when unset.
    pub debug_dir: Option<PathBuf>,
    pub overlay_color: RgbaColor,
}

impl Default for PhotoSettings {
    fn default() -> Self {
        Self {
            crop: false,
            enhancement: None,
            interactive: false,
            debug_overlay: false,
            debug_dir: None,
            overlay_color: RgbaColor::GREEN,
        }
    }
}

/// Which parts of a card are printed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrintMode {
    /// Photos only, for plain paper.
    Photo,
    /// Text blocks only, for transparent foil.
    Text,
    /// Photo and text side by side.
    #[default]
    All,
}

impl PrintMode {
    pub fn prints_photo(self) -> bool {
        self != PrintMode::Text
    }

    pub fn prints_text(self) -> bool {
        self != PrintMode::Photo
    }
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrintMode::Photo => "photo",
            PrintMode::Text => "text",
            PrintMode::All => "all",
        })
    }
}

impl FromStr for PrintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" | "photo_only" | "1" => Ok(PrintMode::Photo),
            "text" | "text_only" | "2" => Ok(PrintMode::Text),
            "all" | "3" => Ok(PrintMode::All),
            other => Err(format!(
                "invalid print mode '{other}'; expected photo, text or all"
            )),
        }
    }
}

/// Order in which cards fill a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrintDirection {
    /// Top-left to bottom-right.
    #[default]
    Normal,
    /// Bottom-right to top-left, for printing the foil that goes on the back.
    Reversed,
}

impl fmt::Display for PrintDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrintDirection::Normal => "normal",
            PrintDirection::Reversed => "reversed",
        })
    }
}

impl FromStr for PrintDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "1" => Ok(PrintDirection::Normal),
            "reversed" | "reverse" | "2" => Ok(PrintDirection::Reversed),
            other => Err(format!(
                "invalid print direction '{other}'; expected normal or reversed"
            )),
        }
    }
}

/// Cut marks drawn between neighbouring cards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterStyle {
    #[default]
    Cross,
    Frame,
}

impl fmt::Display for DelimiterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DelimiterStyle::Cross => "cross",
            DelimiterStyle::Frame => "frame",
        })
    }
}

impl FromStr for DelimiterStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cross" => Ok(DelimiterStyle::Cross),
            "frame" => Ok(DelimiterStyle::Frame),
            other => Err(format!(
                "invalid delimiter style '{other}'; expected cross or frame"
            )),
        }
    }
}

/// Page geometry and rendering options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutSettings {
    pub mode: PrintMode,
    pub direction: PrintDirection,
    pub delimiter: DelimiterStyle,
    /// Raster resolution of the rendered pages.
    pub dpi: u32,
    /// TrueType font used for captions and text blocks.
    pub font_path: Option<PathBuf>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            mode: PrintMode::default(),
            direction: PrintDirection::default(),
            delimiter: DelimiterStyle::default(),
            dpi: 300,
            font_path: None,
        }
    }
}

/// Fixed lines printed on every card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CardText {
    pub faculty: String,
    pub section: String,
}

impl Default for CardText {
    fn default() -> Self {
        Self {
            faculty: "VUT Brno".to_string(),
            section: "ESN VUT Brno".to_string(),
        }
    }
}

/// Where people and their photos come from, and where pages go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordSettings {
    pub image_dir: PathBuf,
    pub people_csv: PathBuf,
    /// Output prefix; `output-<mode>` when unset.
    pub output: Option<PathBuf>,
    /// Accepted photo extensions, without the leading dot.
    pub extensions: Vec<String>,
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("pictures"),
            people_csv: PathBuf::from("students.csv"),
            output: None,
            extensions: ["jpg", "jpeg", "png", "gif", "bmp", "tiff"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl RecordSettings {
    /// Output prefix, falling back to `output-<mode>`.
    pub fn output_prefix(&self, mode: PrintMode) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("output-{mode}")))
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.trim().parse().unwrap_or(LevelFilter::Debug)
    }
}

/// Everything a batch run needs, loaded from JSON and overridden from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// YuNet ONNX model used when a photo needs face detection.
    pub model_path: Option<String>,
    pub input: InputDimensions,
    pub detection: DetectionSettings,
    pub photo: PhotoSettings,
    pub layout: LayoutSettings,
    pub card: CardText,
    pub records: RecordSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: Some(DEFAULT_MODEL_PATH.into()),
            input: InputDimensions::default(),
            detection: DetectionSettings::default(),
            photo: PhotoSettings::default(),
            layout: LayoutSettings::default(),
            card: CardText::default(),
            records: RecordSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file. A missing `model_path` falls back to the default model.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.model_path.is_none() {
            settings.model_path = Some(DEFAULT_MODEL_PATH.into());
        }
        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }

    /// Reject combinations no run can honour.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (1..=1200).contains(&self.layout.dpi),
            "dpi must be between 1 and 1200, got {}",
            self.layout.dpi
        );
        anyhow::ensure!(
            !self.records.extensions.is_empty(),
            "at least one photo extension is required"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.detection.score_threshold),
            "score_threshold must be within 0..=1, got {}",
            self.detection.score_threshold
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.detection.nms_threshold),
            "nms_threshold must be within 0..=1, got {}",
            self.detection.nms_threshold
        );
        anyhow::ensure!(
            self.detection.scale_step > 1.0,
            "scale_step must be greater than 1, got {}",
            self.detection.scale_step
        );
        anyhow::ensure!(
            self.input.width > 0 && self.input.height > 0,
            "input dimensions must be non-zero"
        );
        Ok(())
    }
}

/// Returns the default path for persisted settings (`config/cardsheet.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/cardsheet.json"))
        .unwrap_or_else(|_| PathBuf::from("config/cardsheet.json"))
}
