//! The per-person loop: find the photo, run the pipeline, place the card.

use std::{
    fs,
    path::{Path, PathBuf},
};

use ab_glyph::FontVec;
use anyhow::{Context, Result};
use cardsheet_core::{
    ContentSpacing, GridCursor, PhotoPipeline, Presenter, PrintMode, Sheet, text_origin,
};
use cardsheet_utils::{PersonRecord, config::AppSettings};
use image::RgbImage;
use log::{error, info, warn};

use crate::{
    input::find_photo,
    types::{PersonReport, PhotoStatus},
};

/// Places cards one person at a time onto a growing [`Sheet`].
pub struct CardBatch {
    mode: PrintMode,
    pipeline: PhotoPipeline,
    photos: Vec<PathBuf>,
    interactive: bool,
    overlay_dir: PathBuf,
    presenter: Option<Box<dyn Presenter>>,
    cursor: GridCursor,
    sheet: Sheet,
    page_pending: bool,
}

impl CardBatch {
    pub fn new(
        settings: &AppSettings,
        pipeline: PhotoPipeline,
        photos: Vec<PathBuf>,
        font: Option<FontVec>,
        presenter: Option<Box<dyn Presenter>>,
    ) -> Self {
        let layout = &settings.layout;
        let spacing = ContentSpacing::new(layout.mode, layout.direction);
        Self {
            mode: layout.mode,
            pipeline,
            photos,
            interactive: settings.photo.interactive,
            overlay_dir: settings
                .photo
                .debug_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            presenter,
            cursor: GridCursor::new(spacing),
            sheet: Sheet::new(spacing, layout.delimiter, layout.dpi, font),
            page_pending: false,
        }
    }

    /// Place one person's card.
    ///
    /// Per-photo problems end up in the report; only batch-fatal errors are
    /// returned. A person whose photo was skipped or failed is left out
    /// entirely: nothing is drawn and the cursor stays put.
    pub fn place(&mut self, person: &PersonRecord) -> Result<PersonReport> {
        let mut report = PersonReport::new(person);
        let position = self.cursor.position();

        if self.mode.prints_photo() {
            match find_photo(&self.photos, &person.name, self.interactive)? {
                None => {
                    error!(
                        "Could not find a photo for '{}', leaving the slot empty",
                        person.name
                    );
                    report.status = PhotoStatus::Missing;
                }
                Some(path) => {
                    report.photo = Some(path.display().to_string());
                    let presenter = self
                        .presenter
                        .as_mut()
                        .map(|p| &mut **p as &mut dyn Presenter);
                    match self.pipeline.process_photo(&path, presenter) {
                        Ok(result) => {
                            report.faces = result.faces;
                            report.region = result.region;
                            if let Some(overlay) = result.overlay.as_ref() {
                                report.overlay = self.save_overlay(&path, overlay);
                            }
                            self.start_pending_page();
                            self.sheet.place_photo(position, &result.image);
                            self.sheet.place_caption(position, &person.caption());
                            report.status = PhotoStatus::Placed;
                        }
                        Err(err) if err.is_batch_fatal() => return Err(err.into()),
                        Err(err) => {
                            if err.is_skip() {
                                warn!("Skipping '{}' at the operator's request", person.name);
                                report.status = PhotoStatus::Skipped;
                            } else {
                                let err = anyhow::Error::from(err);
                                error!(
                                    "Could not process {}, leaving '{}' out: {err:#}",
                                    path.display(),
                                    person.name
                                );
                                report.error = Some(format!("{err:#}"));
                                report.status = PhotoStatus::Failed;
                            }
                            return Ok(report);
                        }
                    }
                }
            }
        }

        self.start_pending_page();
        if self.mode.prints_text() {
            self.sheet
                .place_person_info(text_origin(self.mode, position), person);
        }
        report.page = Some(self.cursor.page() + 1);

        let step = self.cursor.advance();
        if let Some(mark) = step.delimiter {
            self.sheet.draw_delimiter(mark);
        }
        self.page_pending = step.new_page;
        Ok(report)
    }

    /// Hand back the rendered sheet.
    pub fn finish(self) -> Sheet {
        self.sheet
    }

    fn start_pending_page(&mut self) {
        if self.page_pending {
            self.sheet.add_page();
            self.page_pending = false;
        }
    }

    fn save_overlay(&self, source: &Path, overlay: &RgbImage) -> Option<String> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo".to_string());
        let path = self.overlay_dir.join(format!("{stem}-overlay.png"));
        let saved = fs::create_dir_all(&self.overlay_dir)
            .with_context(|| format!("failed to create {}", self.overlay_dir.display()))
            .and_then(|()| {
                overlay
                    .save(&path)
                    .with_context(|| format!("failed to save overlay {}", path.display()))
            });
        match saved {
            Ok(()) => {
                info!("Overlay saved to {}", path.display());
                Some(path.display().to_string())
            }
            Err(err) => {
                warn!("{err:#}");
                None
            }
        }
    }
}
