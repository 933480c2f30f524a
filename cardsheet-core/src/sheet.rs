//! Rendering of card sheets into a printable PDF.
//!
//! A [`Sheet`] owns white A4 pages rasterised at a fixed DPI and draws photos,
//! captions, text blocks and cut marks at millimetre positions produced by
//! [`crate::layout::GridCursor`]. Text positions are baselines. [`Sheet::save`]
//! writes every page as a full-bleed image into one PDF document.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use anyhow::{Context, Result};
use cardsheet_utils::{PersonRecord, mm_to_px, records::date_fields};
use image::{Rgb, RgbImage, imageops};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut},
    rect::Rect,
};
use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

use crate::layout::{
    CAPTION_GAP_MM, ContentSpacing, DAY_DELTA_MM, DelimiterStyle, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    PHOTO_HEIGHT_MM, PHOTO_WIDTH_MM, Position, TextDeltas, X_SPACING_MM, Y_SPACING_MM,
};

pub const CAPTION_FONT_PT: f32 = 6.0;
pub const INFO_FONT_PT: f32 = 8.0;

const LINE_WIDTH_MM: f32 = 0.2;
const DASH_MM: f32 = 1.0;

const POINTS_PER_MM: f32 = 72.0 / 25.4;
const PAGE_IMAGE: &str = "Page";

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Fonts tried when none is configured.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "fonts/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load the configured font, or the first usable system font.
///
/// A configured path that cannot be read or parsed is an error. Without a
/// configured path, `Ok(None)` means no system font was found.
pub fn load_font(path: Option<&Path>) -> Result<Option<FontVec>> {
    if let Some(path) = path {
        let data =
            std::fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .with_context(|| format!("failed to parse font {}", path.display()))?;
        log::info!("loaded font {}", path.display());
        return Ok(Some(font));
    }

    for candidate in SYSTEM_FONT_CANDIDATES {
        if let Ok(data) = std::fs::read(candidate)
            && let Ok(font) = FontVec::try_from_vec(data)
        {
            log::info!("loaded system font {candidate}");
            return Ok(Some(font));
        }
    }
    log::debug!("no system font found");
    Ok(None)
}

/// Pages of cards being rendered.
pub struct Sheet {
    dpi: u32,
    spacing: ContentSpacing,
    delimiter: DelimiterStyle,
    font: Option<FontVec>,
    pages: Vec<RgbImage>,
}

impl std::fmt::Debug for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sheet")
            .field("dpi", &self.dpi)
            .field("delimiter", &self.delimiter)
            .field("has_font", &self.font.is_some())
            .field("pages", &self.pages.len())
            .finish()
    }
}

impl Sheet {
    /// Start a sheet with one blank page.
    pub fn new(
        spacing: ContentSpacing,
        delimiter: DelimiterStyle,
        dpi: u32,
        font: Option<FontVec>,
    ) -> Self {
        let mut sheet = Self {
            dpi,
            spacing,
            delimiter,
            font,
            pages: Vec::new(),
        };
        sheet.add_page();
        sheet
    }

    pub fn add_page(&mut self) {
        let width = mm_to_px(PAGE_WIDTH_MM, self.dpi);
        let height = mm_to_px(PAGE_HEIGHT_MM, self.dpi);
        self.pages.push(RgbImage::from_pixel(width, height, PAPER));
    }

    pub fn pages(&self) -> &[RgbImage] {
        &self.pages
    }

    fn px(&self, mm: f32) -> f32 {
        mm / 25.4 * self.dpi as f32
    }

    fn page_mut(&mut self) -> &mut RgbImage {
        if self.pages.is_empty() {
            self.add_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Draw `photo` scaled to the card photo size with its top-left corner at `at`.
    pub fn place_photo(&mut self, at: Position, photo: &RgbImage) {
        let width = mm_to_px(PHOTO_WIDTH_MM, self.dpi).max(1);
        let height = mm_to_px(PHOTO_HEIGHT_MM, self.dpi).max(1);
        let resized = imageops::resize(photo, width, height, imageops::FilterType::Lanczos3);
        let (x, y) = (self.px(at.x).round() as i64, self.px(at.y).round() as i64);
        imageops::overlay(self.page_mut(), &resized, x, y);
    }

    /// Write `text` under the photo placed at `at`.
    pub fn place_caption(&mut self, at: Position, text: &str) {
        let baseline = at.offset(0.0, PHOTO_HEIGHT_MM + CAPTION_GAP_MM);
        self.text(baseline, CAPTION_FONT_PT, text);
    }

    /// Write the card text block with its first baseline at `at`.
    pub fn place_person_info(&mut self, at: Position, person: &PersonRecord) {
        let deltas = TextDeltas::CARD;
        let fields = [
            (deltas.name, person.name.as_str()),
            (deltas.nationality, person.nationality.as_str()),
            (deltas.faculty, person.faculty.as_str()),
            (deltas.section, person.section.as_str()),
        ];
        for (delta, text) in fields {
            self.text(at.offset(delta.x, delta.y), INFO_FONT_PT, text);
        }

        for (delta, date) in [
            (deltas.birthday, person.birthday),
            (deltas.validity, person.validity),
        ] {
            for (i, part) in date_fields(date).iter().enumerate() {
                let origin = at.offset(delta.x + i as f32 * DAY_DELTA_MM, delta.y);
                self.text(origin, INFO_FONT_PT, part);
            }
        }
    }

    /// Draw a cut mark in the configured style.
    pub fn draw_delimiter(&mut self, at: Position) {
        match self.delimiter {
            DelimiterStyle::Cross => {
                let dx = X_SPACING_MM / 3.0;
                let dy = Y_SPACING_MM / 3.0;
                self.line(at.offset(-dx, 0.0), at.offset(dx, 0.0));
                self.line(at.offset(0.0, -dy), at.offset(0.0, dy));
            }
            DelimiterStyle::Frame => {
                let right = at.offset(self.spacing.x_increment.abs(), 0.0);
                let down = at.offset(0.0, self.spacing.y_increment.abs());
                self.dashed_line(at, right);
                self.dashed_line(at, down);
            }
        }
    }

    fn text(&mut self, baseline: Position, size_pt: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(font) = self.font.as_ref() else {
            log::debug!("no font, dropping text '{text}'");
            return;
        };
        let px_per_em = size_pt / 72.0 * self.dpi as f32;
        let scale = PxScale::from(
            font.units_per_em()
                .map_or(px_per_em, |upem| px_per_em * font.height_unscaled() / upem),
        );
        let ascent = font.as_scaled(scale).ascent();
        let x = self.px(baseline.x).round() as i32;
        let y = (self.px(baseline.y) - ascent).round() as i32;

        let last = self.pages.len().saturating_sub(1);
        if let Some(page) = self.pages.get_mut(last) {
            draw_text_mut(page, INK, x, y, scale, font, text);
        }
    }

    /// Axis-aligned line between two points.
    fn line(&mut self, from: Position, to: Position) {
        let thickness = self.px(LINE_WIDTH_MM).round().max(1.0);
        let (x0, x1) = (self.px(from.x.min(to.x)), self.px(from.x.max(to.x)));
        let (y0, y1) = (self.px(from.y.min(to.y)), self.px(from.y.max(to.y)));
        let width = (x1 - x0).round().max(thickness) as u32;
        let height = (y1 - y0).round().max(thickness) as u32;
        let rect = Rect::at(x0.round() as i32, y0.round() as i32).of_size(width, height);
        draw_filled_rect_mut(self.page_mut(), rect, INK);
    }

    fn dashed_line(&mut self, from: Position, to: Position) {
        let length = ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt();
        if length <= 0.0 {
            return;
        }
        let (ux, uy) = ((to.x - from.x) / length, (to.y - from.y) / length);
        let mut start = 0.0;
        while start < length {
            let end = (start + DASH_MM).min(length);
            self.line(
                from.offset(ux * start, uy * start),
                from.offset(ux * end, uy * end),
            );
            start += 2.0 * DASH_MM;
        }
    }

    /// Write all pages into `<prefix>.pdf` and return its path.
    pub fn save(&self, prefix: &Path) -> Result<PathBuf> {
        let path = prefix.with_extension("pdf");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut document = self.to_pdf()?;
        document
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("wrote {} page(s) to {}", self.pages.len(), path.display());
        Ok(path)
    }

    /// Build the PDF document: one A4 page per raster, the raster scaled to
    /// cover the whole media box.
    pub fn to_pdf(&self) -> Result<Document> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let width_pt = PAGE_WIDTH_MM * POINTS_PER_MM;
        let height_pt = PAGE_HEIGHT_MM * POINTS_PER_MM;

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let page_id = add_page_image(&mut document, pages_id, page, width_pt, height_pt)?;
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document.compress();
        Ok(document)
    }
}

fn add_page_image(
    document: &mut Document,
    pages_id: ObjectId,
    page: &RgbImage,
    width_pt: f32,
    height_pt: f32,
) -> Result<ObjectId> {
    let (width, height) = page.dimensions();
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        page.as_raw().clone(),
    );
    let image_id = document.add_object(image);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0.into(),
                    0.into(),
                    height_pt.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(PAGE_IMAGE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content.encode().context("failed to encode page content")?;
    let content_id = document.add_object(Stream::new(dictionary! {}, encoded));

    Ok(document.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                PAGE_IMAGE => image_id,
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PrintDirection, PrintMode};

    fn sheet(delimiter: DelimiterStyle) -> Sheet {
        let spacing = ContentSpacing::new(PrintMode::Photo, PrintDirection::Normal);
        Sheet::new(spacing, delimiter, 100, None)
    }

    fn ink_in(page: &RgbImage, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> usize {
        y.flat_map(|py| x.clone().map(move |px| (px, py)))
            .filter(|&(px, py)| page.get_pixel(px, py) == &INK)
            .count()
    }

    #[test]
    fn pages_are_white_a4() {
        let sheet = sheet(DelimiterStyle::Cross);
        let page = &sheet.pages()[0];
        assert_eq!(page.dimensions(), (mm_to_px(210.0, 100), mm_to_px(297.0, 100)));
        assert!(page.pixels().all(|p| *p == PAPER));
    }

    #[test]
    fn photo_is_scaled_into_its_slot() {
        let mut sheet = sheet(DelimiterStyle::Cross);
        let photo = RgbImage::from_pixel(270, 370, Rgb([200, 10, 10]));
        sheet.place_photo(Position::new(10.0, 20.0), &photo);

        let page = &sheet.pages()[0];
        let (x, y) = (mm_to_px(10.0, 100), mm_to_px(20.0, 100));
        let inside = page.get_pixel(x + 5, y + 5);
        assert!(inside[0] > 190 && inside[1] < 20, "{inside:?}");
        let right = x + mm_to_px(PHOTO_WIDTH_MM, 100);
        assert_eq!(page.get_pixel(right + 2, y + 5), &PAPER);
        let bottom = y + mm_to_px(PHOTO_HEIGHT_MM, 100);
        assert_eq!(page.get_pixel(x + 5, bottom + 2), &PAPER);
    }

    #[test]
    fn cross_delimiter_is_small() {
        let mut sheet = sheet(DelimiterStyle::Cross);
        sheet.draw_delimiter(Position::new(50.0, 50.0));
        let page = &sheet.pages()[0];
        let c = mm_to_px(50.0, 100);
        assert!(ink_in(page, c - 3..c + 3, c - 3..c + 3) > 0);
        assert_eq!(ink_in(page, c + 10..c + 40, c - 3..c + 3), 0);
    }

    #[test]
    fn frame_delimiter_runs_along_the_card() {
        let mut sheet = sheet(DelimiterStyle::Frame);
        sheet.draw_delimiter(Position::new(50.0, 50.0));
        let page = &sheet.pages()[0];
        let c = mm_to_px(50.0, 100);
        let card_w = mm_to_px(29.0, 100);
        assert!(ink_in(page, c + card_w / 2..c + card_w, c - 1..c + 2) > 0);
        assert!(ink_in(page, c - 1..c + 2, c + 50..c + 100) > 0);
    }

    #[test]
    fn text_without_font_is_dropped() {
        let mut sheet = sheet(DelimiterStyle::Cross);
        sheet.place_caption(Position::new(10.0, 10.0), "CZ: Ana");
        assert!(sheet.pages()[0].pixels().all(|p| *p == PAPER));
    }

    #[test]
    fn pages_are_saved_into_one_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = sheet(DelimiterStyle::Cross);
        sheet.add_page();
        let written = sheet.save(&dir.path().join("out").join("output-photo")).unwrap();
        assert!(written.ends_with("output-photo.pdf"));

        let document = Document::load(&written).unwrap();
        let pages = document.get_pages();
        assert_eq!(pages.len(), 2);
        let first = document.get_dictionary(pages[&1]).unwrap();
        let media_box = first.get(b"MediaBox").unwrap().as_array().unwrap();
        let width = media_box[2].as_float().unwrap();
        assert!((width - 595.28).abs() < 0.1, "width {width}");
    }

    #[test]
    fn pdf_pages_embed_the_rasters() {
        let sheet = sheet(DelimiterStyle::Cross);
        let document = sheet.to_pdf().unwrap();
        let page_id = document.get_pages()[&1];
        let page = document.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let images = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = images.get(PAGE_IMAGE.as_bytes()).unwrap().as_reference().unwrap();
        let image = document.get_object(image_id).unwrap().as_stream().unwrap();
        let (width, height) = sheet.pages()[0].dimensions();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), width as i64);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), height as i64);
    }

    #[test]
    fn missing_configured_font_is_an_error() {
        assert!(load_font(Some(Path::new("/definitely/not/here.ttf"))).is_err());
    }
}
