mod args;
mod batch;
mod config;
mod input;
mod presenter;
mod types;

use std::{fs::File, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use cardsheet_core::{
    FaceDetector, PhotoPipeline, PipelineConfig, PipelineError, Presenter, YuNetClassifier,
    load_font,
};
use cardsheet_utils::{
    config::{AppSettings, DEFAULT_MODEL_PATH},
    configure_telemetry, init_logging, load_people,
};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    args::CardsheetArgs,
    batch::CardBatch,
    config::{apply_cli_overrides, load_settings},
    input::collect_photos,
    presenter::TerminalPresenter,
    types::{PhotoStatus, RunReport},
};

fn main() -> Result<()> {
    init_logging(LevelFilter::Info)?;
    let args = CardsheetArgs::parse();

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );
    settings
        .validate()
        .map_err(|err| PipelineError::InvalidConfig(format!("{err:#}")))?;

    let mode = settings.layout.mode;
    let direction = settings.layout.direction;
    info!(
        "Printing mode {mode}, direction {direction}, {} dpi, crop {}, enhancement {}",
        settings.layout.dpi,
        settings.photo.crop,
        settings
            .photo
            .enhancement
            .map_or_else(|| "off".to_string(), |m| m.to_string())
    );

    let pipeline = build_pipeline(&settings)?;

    let font = load_font(settings.layout.font_path.as_deref())?;
    if font.is_none() {
        if mode.prints_text() {
            anyhow::bail!(
                "no usable font found for {mode} mode; pass --font <TTF> or set layout.font_path"
            );
        }
        warn!("No usable font found, photo captions will be left out");
    }

    let people = load_people(&settings.records.people_csv, &settings.card)?;
    if people.is_empty() {
        warn!(
            "{} contains no printable rows",
            settings.records.people_csv.display()
        );
    }

    let photos = if mode.prints_photo() {
        collect_photos(&settings.records.image_dir, &settings.records.extensions)?
    } else {
        Vec::new()
    };

    let presenter: Option<Box<dyn Presenter>> =
        if settings.photo.interactive && mode.prints_photo() {
            let terminal = TerminalPresenter::stdio().context("failed to set up the prompt")?;
            info!("Variant images go to {}", terminal.image_dir().display());
            Some(Box::new(terminal))
        } else {
            None
        };

    let mut batch = CardBatch::new(&settings, pipeline, photos, font, presenter);
    let mut reports = Vec::with_capacity(people.len());
    for (index, person) in people.iter().enumerate() {
        info!("Exporting ({}/{}) {}", index + 1, people.len(), person.name);
        reports.push(batch.place(person)?);
    }

    let prefix = settings.records.output_prefix(mode);
    let sheet = batch.finish();
    let page_count = sheet.pages().len();
    let output = sheet.save(&prefix)?;

    let report = RunReport {
        mode: mode.to_string(),
        direction: direction.to_string(),
        output: output.display().to_string(),
        pages: page_count,
        people: reports,
    };
    info!(
        "{} page(s) written; photos placed {}, missing {}, skipped {}, failed {}",
        report.pages,
        report.count(PhotoStatus::Placed),
        report.count(PhotoStatus::Missing),
        report.count(PhotoStatus::Skipped),
        report.count(PhotoStatus::Failed)
    );

    if let Some(report_path) = args.report.as_ref() {
        if let Some(dir) = report_path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let file = File::create(report_path)
            .with_context(|| format!("failed to create {}", report_path.display()))?;
        serde_json::to_writer_pretty(file, &report)
            .with_context(|| format!("failed to write report to {}", report_path.display()))?;
        info!("Wrote report to {}", report_path.display());
    }

    Ok(())
}

/// Build the photo pipeline, loading the model only when some step needs it.
fn build_pipeline(settings: &AppSettings) -> Result<PhotoPipeline, PipelineError> {
    if !settings.layout.mode.prints_photo() {
        return PhotoPipeline::new(PipelineConfig::default(), None);
    }

    let config = PipelineConfig::from_settings(&settings.photo);
    let detector = if config.needs_detection() {
        Some(load_detector(settings)?)
    } else {
        None
    };
    PhotoPipeline::new(config, detector)
}

fn load_detector(settings: &AppSettings) -> Result<FaceDetector, PipelineError> {
    let path = PathBuf::from(settings.model_path.as_deref().unwrap_or(DEFAULT_MODEL_PATH));
    info!(
        "Loading YuNet model from {} at resolution {}x{}",
        path.display(),
        settings.input.width,
        settings.input.height
    );
    let classifier = YuNetClassifier::from_settings(&path, settings)
        .map_err(|source| PipelineError::ModelLoad {
            path: path.clone(),
            source,
        })?;
    Ok(FaceDetector::new(Arc::new(classifier)))
}
