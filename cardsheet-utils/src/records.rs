//! Person records read from the people CSV.
//!
//! The sheet expects one row per person with the name, the country and two dates
//! split into digit columns (`D0 D1 M0 M1 Y0 Y1` for the birthday, `TD0 .. TY1`
//! for card validity). Years are stored as two digits and read as `20YY`.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use log::warn;
use serde::{Deserialize, Serialize};
use time::{Date, Month, macros::format_description};

use crate::config::CardText;

/// One person ready to be printed on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonRecord {
    pub name: String,
    pub nationality: String,
    pub birthday: Date,
    pub validity: Date,
    pub faculty: String,
    pub section: String,
    pub before_arrival: String,
}

impl PersonRecord {
    /// `"{nationality}: {name}"`, printed under the photo.
    pub fn caption(&self) -> String {
        format!("{}: {}", self.nationality, self.name)
    }
}

/// Day, month and two-digit year of `date`, each zero padded.
pub fn date_fields(date: Date) -> [String; 3] {
    [
        format!("{:02}", date.day()),
        format!("{:02}", u8::from(date.month())),
        format!("{:02}", date.year().rem_euclid(100)),
    ]
}

/// ISO `YYYY-MM-DD` rendering used in reports and logs.
pub fn iso_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    country: String,
    #[serde(rename = "D0")]
    d0: String,
    #[serde(rename = "D1")]
    d1: String,
    #[serde(rename = "M0")]
    m0: String,
    #[serde(rename = "M1")]
    m1: String,
    #[serde(rename = "Y0")]
    y0: String,
    #[serde(rename = "Y1")]
    y1: String,
    #[serde(rename = "TD0")]
    td0: String,
    #[serde(rename = "TD1")]
    td1: String,
    #[serde(rename = "TM0")]
    tm0: String,
    #[serde(rename = "TM1")]
    tm1: String,
    #[serde(rename = "TY0")]
    ty0: String,
    #[serde(rename = "TY1")]
    ty1: String,
    #[serde(default)]
    before_arrival: String,
}

impl RawRecord {
    fn into_person(self, card: &CardText) -> Result<PersonRecord> {
        let name = self.name.trim().to_string();
        anyhow::ensure!(!name.is_empty(), "row has an empty name");
        let birthday = digits_to_date(
            [&self.y0, &self.y1],
            [&self.m0, &self.m1],
            [&self.d0, &self.d1],
        )
        .with_context(|| format!("invalid birthday for {name}"))?;
        let validity = digits_to_date(
            [&self.ty0, &self.ty1],
            [&self.tm0, &self.tm1],
            [&self.td0, &self.td1],
        )
        .with_context(|| format!("invalid validity date for {name}"))?;

        Ok(PersonRecord {
            name,
            nationality: self.country.trim().to_string(),
            birthday,
            validity,
            faculty: card.faculty.clone(),
            section: card.section.clone(),
            before_arrival: self.before_arrival.trim().to_string(),
        })
    }
}

fn digits_to_date(year: [&str; 2], month: [&str; 2], day: [&str; 2]) -> Result<Date> {
    let number = |parts: [&str; 2]| -> Result<u32> {
        let joined = format!("{}{}", parts[0].trim(), parts[1].trim());
        joined
            .parse::<u32>()
            .with_context(|| format!("'{joined}' is not a number"))
    };
    let year = 2000 + number(year)? as i32;
    let month = Month::try_from(number(month)? as u8)
        .map_err(|err| anyhow!("month out of range: {err}"))?;
    let day = number(day)? as u8;
    Date::from_calendar_date(year, month, day).map_err(|err| anyhow!("{err}"))
}

/// Read every person from `path`, sorted by `(nationality, name)`.
///
/// Rows that fail to parse are logged and skipped; only an unreadable file or a
/// missing header is an error.
pub fn load_people(path: &Path, card: &CardText) -> Result<Vec<PersonRecord>> {
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read CSV headers from {}", path.display()))?;
    for required in ["name", "country"] {
        anyhow::ensure!(
            headers.iter().any(|h| h == required),
            "{} is missing the '{required}' column",
            path.display()
        );
    }

    let mut people = Vec::new();
    for (row, result) in reader.deserialize::<RawRecord>().enumerate() {
        let parsed = result
            .map_err(anyhow::Error::from)
            .and_then(|raw| raw.into_person(card));
        match parsed {
            Ok(person) => people.push(person),
            Err(err) => warn!("skipping row {} of {}: {err:#}", row + 2, path.display()),
        }
    }

    people.sort_by(|a, b| {
        a.nationality
            .cmp(&b.nationality)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(people)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "name,country,D0,D1,M0,M1,Y0,Y1,TD0,TD1,TM0,TM1,TY0,TY1,before_arrival";

    fn csv_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(file, "{HEADER}").expect("header");
        for row in rows {
            writeln!(file, "{row}").expect("row");
        }
        file
    }

    #[test]
    fn parses_and_sorts_by_country_then_name() {
        let file = csv_file(&[
            "Zoe Novak,Spain,0,1,0,2,0,3,3,1,1,2,2,4,no",
            "Ana Lopez,Spain,1,5,1,1,9,9,3,0,0,6,2,5,yes",
            "Marta Kis,Italy,2,8,0,2,0,0,3,1,0,8,2,4,",
        ]);
        let people = load_people(file.path(), &CardText::default()).expect("load");
        let names: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Marta Kis", "Ana Lopez", "Zoe Novak"]);

        let ana = &people[1];
        assert_eq!(ana.birthday, Date::from_calendar_date(2099, Month::November, 15).unwrap());
        assert_eq!(ana.validity, Date::from_calendar_date(2025, Month::June, 30).unwrap());
        assert_eq!(ana.faculty, "VUT Brno");
        assert_eq!(ana.section, "ESN VUT Brno");
        assert_eq!(ana.caption(), "Spain: Ana Lopez");
    }

    #[test]
    fn invalid_rows_are_skipped() {
        let file = csv_file(&[
            "Good Person,Chile,0,1,0,1,0,1,0,1,0,1,2,6,",
            "Bad Month,Chile,0,1,1,3,0,1,0,1,0,1,2,6,",
            "Bad Digit,Chile,x,1,0,1,0,1,0,1,0,1,2,6,",
        ]);
        let people = load_people(file.path(), &CardText::default()).expect("load");
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].name, "Good Person");
    }

    #[test]
    fn before_arrival_column_is_optional() {
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(file, "name,country,D0,D1,M0,M1,Y0,Y1,TD0,TD1,TM0,TM1,TY0,TY1").unwrap();
        writeln!(file, "Jo Park,Korea,0,9,0,9,0,9,0,1,0,1,2,7").unwrap();
        let people = load_people(file.path(), &CardText::default()).expect("load");
        assert_eq!(people[0].before_arrival, "");
    }

    #[test]
    fn records_serialize_with_their_dates() {
        let file = csv_file(&["Jo Park,Korea,0,9,0,9,0,9,0,1,0,1,2,7,"]);
        let people = load_people(file.path(), &CardText::default()).expect("load");
        let json = serde_json::to_value(&people[0]).expect("serialize");
        assert_eq!(json["name"], "Jo Park");
        assert_eq!(json["nationality"], "Korea");
        assert!(!json["birthday"].is_null());
        assert!(!json["validity"].is_null());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_people(Path::new("/nonexistent/people.csv"), &CardText::default())
            .expect_err("missing file");
        assert!(err.to_string().contains("failed to open"));
    }

    #[test]
    fn date_fields_are_zero_padded() {
        let date = Date::from_calendar_date(2007, Month::March, 4).unwrap();
        assert_eq!(date_fields(date), ["04", "03", "07"]);
        assert_eq!(iso_date(date), "2007-03-04");
    }
}
