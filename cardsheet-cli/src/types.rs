//! Serializable run report.

use cardsheet_core::Rectangle;
use cardsheet_utils::{PersonRecord, records::iso_date};
use serde::Serialize;

/// What happened to one person's photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoStatus {
    /// The photo was placed on the sheet.
    Placed,
    /// No file matched the person's name.
    Missing,
    /// The operator skipped the photo.
    Skipped,
    /// Decoding or detection failed.
    Failed,
    /// The print mode has no photos.
    NotPrinted,
}

#[derive(Debug, Serialize)]
pub struct PersonReport {
    pub name: String,
    pub nationality: String,
    pub birthday: String,
    pub validity: String,
    pub status: PhotoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub faces: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Rectangle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Page the card landed on, starting at 1. `None` when the card was left out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

impl PersonReport {
    pub fn new(person: &PersonRecord) -> Self {
        Self {
            name: person.name.clone(),
            nationality: person.nationality.clone(),
            birthday: iso_date(person.birthday),
            validity: iso_date(person.validity),
            status: PhotoStatus::NotPrinted,
            photo: None,
            faces: 0,
            region: None,
            overlay: None,
            error: None,
            page: None,
        }
    }
}

/// Whole-run summary written by `--report`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub mode: String,
    pub direction: String,
    /// The written PDF.
    pub output: String,
    pub pages: usize,
    pub people: Vec<PersonReport>,
}

impl RunReport {
    pub fn count(&self, status: PhotoStatus) -> usize {
        self.people.iter().filter(|p| p.status == status).count()
    }
}
