//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardsheet_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};
use log::info;

use crate::args::CardsheetArgs;

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments to override loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &CardsheetArgs) {
    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.level = lower.clone();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
        }
    }

    if let Some(dir) = args.image_dir.as_ref() {
        settings.records.image_dir = dir.clone();
    }
    if let Some(csv) = args.people_csv.as_ref() {
        settings.records.people_csv = csv.clone();
    }
    if let Some(output) = args.output.as_ref() {
        settings.records.output = Some(output.clone());
    }

    if let Some(mode) = args.mode {
        settings.layout.mode = mode;
    }
    if let Some(direction) = args.direction {
        settings.layout.direction = direction;
    }
    if let Some(delimiter) = args.delimiter {
        settings.layout.delimiter = delimiter;
    }
    if let Some(dpi) = args.dpi {
        settings.layout.dpi = dpi;
    }
    if let Some(font) = args.font.as_ref() {
        settings.layout.font_path = Some(font.clone());
    }

    if args.crop {
        settings.photo.crop = true;
    }
    if let Some(mode) = args.enhancement {
        settings.photo.enhancement = Some(mode);
    }
    if args.interactive {
        settings.photo.interactive = true;
    }
    if args.debug_overlay {
        settings.photo.debug_overlay = true;
    }
    if let Some(dir) = args.debug_dir.as_ref() {
        settings.photo.debug_dir = Some(dir.clone());
    }

    if let Some(model) = args.model.as_ref() {
        settings.model_path = Some(model.display().to_string());
    }
}
