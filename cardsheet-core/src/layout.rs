//! Card grid geometry on an A4 page, in millimetres.
//!
//! Cards are placed left to right, top to bottom (or the other way round for
//! [`PrintDirection::Reversed`], which is used for printing onto transparent
//! foil that is flipped over the photo sheet). [`GridCursor`] walks the grid
//! and reports where cut marks go and when a page is full.

pub use cardsheet_utils::config::{DelimiterStyle, PrintDirection, PrintMode};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;

pub const PHOTO_WIDTH_MM: f32 = 27.0;
pub const PHOTO_HEIGHT_MM: f32 = 37.0;

/// Largest expected text block.
pub const TEXT_WIDTH_MM: f32 = 46.0;
pub const TEXT_HEIGHT_MM: f32 = 25.0;

pub const BORDER_MM: f32 = 8.0;
pub const X_SPACING_MM: f32 = 2.0;
pub const Y_SPACING_MM: f32 = 4.0;
pub const PHOTO_TEXT_SPACING_MM: f32 = 6.0;

/// Distance between text lines.
pub const ROW_DELTA_MM: f32 = 6.8;
/// Distance from the photo origin to the text block in `all` mode.
pub const TEXT_DELTA_MM: f32 = 30.0;
/// Distance from the text column to the date column.
pub const DATE_DELTA_MM: f32 = 33.0;
/// Distance between day, month and year of a date.
pub const DAY_DELTA_MM: f32 = 5.5;
/// Gap between the photo bottom and the caption baseline.
pub const CAPTION_GAP_MM: f32 = 2.0;

/// A point on the page in millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Baseline offsets of the text fields from the text block origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDeltas {
    pub name: Position,
    pub nationality: Position,
    pub birthday: Position,
    pub faculty: Position,
    pub section: Position,
    pub validity: Position,
}

impl TextDeltas {
    pub const CARD: TextDeltas = TextDeltas {
        name: Position::new(0.0, 0.0),
        nationality: Position::new(0.0, ROW_DELTA_MM),
        birthday: Position::new(DATE_DELTA_MM, ROW_DELTA_MM),
        faculty: Position::new(0.0, 2.0 * ROW_DELTA_MM),
        section: Position::new(0.0, 3.0 * ROW_DELTA_MM),
        validity: Position::new(DATE_DELTA_MM, 3.0 * ROW_DELTA_MM),
    };
}

/// Grid increments and limits for one print mode and direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentSpacing {
    pub mode: PrintMode,
    /// Signed step between columns; negative when reversed.
    pub x_increment: f32,
    /// Signed step between rows; negative when reversed.
    pub y_increment: f32,
    pub left_limit: f32,
    pub top_limit: f32,
    pub right_limit: f32,
    pub bottom_limit: f32,
}

impl ContentSpacing {
    pub fn new(mode: PrintMode, direction: PrintDirection) -> Self {
        let card_height = match mode {
            PrintMode::Text => TEXT_HEIGHT_MM,
            PrintMode::Photo | PrintMode::All => PHOTO_HEIGHT_MM,
        };
        let card_width = match mode {
            PrintMode::Photo => PHOTO_WIDTH_MM,
            PrintMode::Text => TEXT_WIDTH_MM,
            PrintMode::All => PHOTO_WIDTH_MM + PHOTO_TEXT_SPACING_MM + TEXT_WIDTH_MM,
        };
        let sign = match direction {
            PrintDirection::Normal => 1.0,
            PrintDirection::Reversed => -1.0,
        };
        let x_step = card_width + X_SPACING_MM;
        let y_step = card_height + Y_SPACING_MM;

        Self {
            mode,
            x_increment: sign * x_step,
            y_increment: sign * y_step,
            left_limit: BORDER_MM,
            top_limit: BORDER_MM,
            right_limit: PAGE_WIDTH_MM - BORDER_MM - x_step,
            bottom_limit: PAGE_HEIGHT_MM - BORDER_MM - y_step,
        }
    }

    /// Where the first card of every page goes.
    pub fn initial_position(&self) -> Position {
        if self.x_increment < 0.0 {
            Position::new(self.right_limit, self.bottom_limit)
        } else {
            Position::new(self.left_limit, self.top_limit)
        }
    }

    fn outside_columns(&self, x: f32) -> bool {
        x < self.left_limit || x > self.right_limit
    }

    fn outside_rows(&self, y: f32) -> bool {
        y < self.top_limit || y > self.bottom_limit
    }
}

/// Origin of the text block for a card placed at `card`.
///
/// In `all` mode the text sits right of the photo, one row down so the first
/// baseline lines up with the photo top.
pub fn text_origin(mode: PrintMode, card: Position) -> Position {
    match mode {
        PrintMode::All => card.offset(TEXT_DELTA_MM, ROW_DELTA_MM),
        PrintMode::Photo | PrintMode::Text => card,
    }
}

/// What happened when the cursor moved past a card.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Advance {
    /// Cut mark between the card just placed and the next one in the row.
    pub delimiter: Option<Position>,
    /// The page is full; the next card starts a new one.
    pub new_page: bool,
}

/// Walks the card grid one card at a time.
#[derive(Debug, Clone)]
pub struct GridCursor {
    spacing: ContentSpacing,
    position: Position,
    page: usize,
}

impl GridCursor {
    pub fn new(spacing: ContentSpacing) -> Self {
        Self {
            spacing,
            position: spacing.initial_position(),
            page: 0,
        }
    }

    pub fn spacing(&self) -> &ContentSpacing {
        &self.spacing
    }

    /// Origin of the current card.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Zero-based index of the current page.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Move to the next card slot.
    pub fn advance(&mut self) -> Advance {
        let spacing = self.spacing;
        let init = spacing.initial_position();
        let mut step = Advance::default();

        self.position.x += spacing.x_increment;
        if spacing.outside_columns(self.position.x) {
            self.position.x = init.x;
            self.position.y += spacing.y_increment;
        } else {
            let mut mark = Position::new(
                self.position.x - X_SPACING_MM / 2.0,
                self.position.y + spacing.y_increment - Y_SPACING_MM / 3.0,
            );
            if spacing.mode == PrintMode::Text {
                // Text origins are baselines, photo origins are top-left corners.
                mark.y -= ROW_DELTA_MM;
            }
            step.delimiter = Some(mark);
        }

        if spacing.outside_rows(self.position.y) {
            log::debug!("page {} full, starting a new one", self.page + 1);
            self.position.y = init.y;
            self.page += 1;
            step.new_page = true;
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn spacing_per_mode() {
        let photo = ContentSpacing::new(PrintMode::Photo, PrintDirection::Normal);
        assert!(approx(photo.x_increment, 29.0));
        assert!(approx(photo.y_increment, 41.0));
        assert!(approx(photo.right_limit, 173.0));
        assert!(approx(photo.bottom_limit, 248.0));

        let text = ContentSpacing::new(PrintMode::Text, PrintDirection::Normal);
        assert!(approx(text.x_increment, 48.0));
        assert!(approx(text.y_increment, 29.0));

        let all = ContentSpacing::new(PrintMode::All, PrintDirection::Reversed);
        assert!(approx(all.x_increment, -81.0));
        assert!(approx(all.y_increment, -41.0));
        assert!(approx(all.right_limit, 121.0));
    }

    #[test]
    fn reversed_grid_starts_bottom_right() {
        let spacing = ContentSpacing::new(PrintMode::Photo, PrintDirection::Reversed);
        assert_eq!(spacing.initial_position(), Position::new(173.0, 248.0));
    }

    #[test]
    fn photo_grid_has_six_columns_and_six_rows() {
        let mut cursor = GridCursor::new(ContentSpacing::new(PrintMode::Photo, PrintDirection::Normal));
        let mut per_page = 0;
        let mut delimiters = 0;
        loop {
            per_page += 1;
            let step = cursor.advance();
            delimiters += usize::from(step.delimiter.is_some());
            if step.new_page {
                break;
            }
        }
        assert_eq!(per_page, 36);
        assert_eq!(delimiters, 30);
        assert_eq!(cursor.page(), 1);
        assert_eq!(cursor.position(), Position::new(8.0, 8.0));
    }

    #[test]
    fn row_wrap_returns_to_first_column() {
        let mut cursor = GridCursor::new(ContentSpacing::new(PrintMode::All, PrintDirection::Normal));
        let first = cursor.advance();
        assert!(first.delimiter.is_some());
        assert!(approx(cursor.position().x, 89.0));
        let wrap = cursor.advance();
        assert!(wrap.delimiter.is_none());
        assert_eq!(cursor.position(), Position::new(8.0, 49.0));
    }

    #[test]
    fn delimiter_sits_between_columns() {
        let mut cursor = GridCursor::new(ContentSpacing::new(PrintMode::Photo, PrintDirection::Normal));
        let mark = cursor.advance().delimiter.unwrap();
        assert!(approx(mark.x, 36.0));
        assert!(approx(mark.y, 8.0 + 41.0 - 4.0 / 3.0));

        let mut text = GridCursor::new(ContentSpacing::new(PrintMode::Text, PrintDirection::Normal));
        let mark = text.advance().delimiter.unwrap();
        assert!(approx(mark.y, 8.0 + 29.0 - 4.0 / 3.0 - ROW_DELTA_MM));
    }

    #[test]
    fn reversed_grid_walks_backwards() {
        let mut cursor = GridCursor::new(ContentSpacing::new(PrintMode::Photo, PrintDirection::Reversed));
        cursor.advance();
        assert!(approx(cursor.position().x, 144.0));
        for _ in 0..5 {
            cursor.advance();
        }
        assert_eq!(cursor.position().x, 173.0);
        assert!(approx(cursor.position().y, 207.0));
    }

    #[test]
    fn text_block_follows_photo_in_all_mode() {
        let card = Position::new(8.0, 8.0);
        let origin = text_origin(PrintMode::All, card);
        assert!(approx(origin.x, 38.0));
        assert!(approx(origin.y, 14.8));
        assert_eq!(text_origin(PrintMode::Text, card), card);
    }
}
