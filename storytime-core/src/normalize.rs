//! Merges loosely shaped fetcher output into [`Event`] records.
//!
//! Fetchers emit one JSON object per calendar item. Which keys are present
//! depends on the feed dialect: LibCal items carry the hosting branch and an
//! audience, Communico items carry neither, only a generic venue and an RFC
//! 2822 timestamp.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    markup::{plain_text, plain_text_opt},
    structs::weekday_name,
    City, Event, Result, VenueType,
};

pub type RawRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedDialect {
    LibCal,
    Communico,
}

/// Provenance attached to every record read from one fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub dialect: FeedDialect,
    pub city: City,
    pub venue_type: VenueType,
    pub default_venue: String,
}

impl Source {
    #[must_use]
    pub fn jersey_city_library() -> Self {
        Self {
            name: "jersey_city_library".into(),
            dialect: FeedDialect::LibCal,
            city: City::JerseyCity,
            venue_type: VenueType::Library,
            default_venue: "Jersey City Free Public Library".into(),
        }
    }

    #[must_use]
    pub fn hoboken_library() -> Self {
        Self {
            name: "hoboken_library".into(),
            dialect: FeedDialect::Communico,
            city: City::Hoboken,
            venue_type: VenueType::Library,
            default_venue: "Hoboken Public Library".into(),
        }
    }

    #[must_use]
    pub fn library_for(city: City) -> Self {
        match city {
            City::JerseyCity => Self::jersey_city_library(),
            City::Hoboken => Self::hoboken_library(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("missing title")]
    MissingTitle,
    #[error("missing link")]
    MissingLink,
    #[error("missing date")]
    MissingDate,
    #[error("unparseable date {0:?}")]
    BadDate(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// A data-quality problem. Logged and counted, never shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIssue {
    #[error("{origin}: dropped record #{index}: {reason}")]
    Dropped {
        origin: String,
        index: usize,
        reason: DropReason,
    },

    #[error("{title:?} on {date}: recorded weekday {recorded:?} disagrees with date, using {actual}")]
    WeekdayMismatch {
        title: String,
        date: NaiveDate,
        recorded: String,
        actual: &'static str,
    },

    #[error("{title:?}: ignoring unparseable {field} {value:?}")]
    BadTime {
        title: String,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub events: Vec<Event>,
    pub issues: Vec<DataIssue>,
}

impl NormalizeReport {
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, DataIssue::Dropped { .. }))
            .count()
    }

    pub fn merge(&mut self, mut other: NormalizeReport) {
        self.events.append(&mut other.events);
        self.issues.append(&mut other.issues);
    }
}

pub(crate) fn note(issues: &mut Vec<DataIssue>, issue: DataIssue) {
    warn!("{issue}");
    issues.push(issue);
}

/// Parses a fetcher output file: a JSON array of objects. Entries that are not
/// objects are skipped.
pub fn raw_records_from_json<S: AsRef<str>>(s: S) -> Result<Vec<RawRecord>> {
    let values: Vec<Value> = serde_json::from_str(s.as_ref())?;
    let total = values.len();

    let records = values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect::<Vec<_>>();

    if records.len() < total {
        warn!(skipped = total - records.len(), "skipping non-object fetcher entries");
    }

    Ok(records)
}

pub fn normalize_source(source: &Source, records: &[RawRecord]) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for (index, record) in records.iter().enumerate() {
        match normalize_record(source, record, &mut report.issues) {
            Ok(event) => report.events.push(event),
            Err(reason) => note(
                &mut report.issues,
                DataIssue::Dropped {
                    origin: source.name.clone(),
                    index,
                    reason,
                },
            ),
        }
    }

    info!(
        source = %source.name,
        kept = report.events.len(),
        dropped = report.dropped(),
        "normalized fetcher output"
    );

    report
}

pub fn normalize_all<'a, I>(sources: I) -> NormalizeReport
where
    I: IntoIterator<Item = (&'a Source, &'a [RawRecord])>,
{
    let mut report = NormalizeReport::default();
    for (source, records) in sources {
        report.merge(normalize_source(source, records));
    }
    report
}

fn normalize_record(
    source: &Source,
    record: &RawRecord,
    issues: &mut Vec<DataIssue>,
) -> std::result::Result<Event, DropReason> {
    let title = text(record, "title")
        .map(plain_text)
        .filter(|title| !title.is_empty())
        .ok_or(DropReason::MissingTitle)?;

    let link = text(record, "link").ok_or(DropReason::MissingLink)?.to_string();

    // Communico only reliably carries the publication timestamp.
    let stamp = text(record, "datetime").and_then(|raw| DateTime::parse_from_rfc2822(raw).ok());

    let date = match (text(record, "date"), stamp) {
        (Some(raw), stamp) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => stamp
                .map(|stamp| stamp.date_naive())
                .ok_or_else(|| DropReason::BadDate(raw.to_string()))?,
        },
        (None, Some(stamp)) => stamp.date_naive(),
        (None, None) => return Err(DropReason::MissingDate),
    };

    let actual = weekday_name(date.weekday());
    if let Some(recorded) = text(record, "day_of_week") {
        if !recorded.eq_ignore_ascii_case(actual) {
            note(
                issues,
                DataIssue::WeekdayMismatch {
                    title: title.clone(),
                    date,
                    recorded: recorded.to_string(),
                    actual,
                },
            );
        }
    }

    let start_time = time_field(record, "start_time", &title, issues)
        .or_else(|| stamp.map(|stamp| stamp.time()));
    let end_time = time_field(record, "end_time", &title, issues);

    let location = plain_text_opt(text(record, "location"));

    let (branch, venue_name) = match source.dialect {
        FeedDialect::LibCal => {
            // The hosting branch, not the calendar the item was listed on.
            let branch = location
                .clone()
                .or_else(|| plain_text_opt(text(record, "calendar_source")));
            let venue = branch.clone().unwrap_or_else(|| source.default_venue.clone());
            (branch, venue)
        }
        FeedDialect::Communico => {
            let venue = location.clone().unwrap_or_else(|| source.default_venue.clone());
            (None, venue)
        }
    };

    let mut event = Event {
        title,
        city: source.city,
        venue_type: source.venue_type,
        venue_name,
        branch,
        date,
        day_of_week: String::new(),
        start_time,
        formatted_time: None,
        end_time,
        formatted_end_time: None,
        duration_hours: None,
        is_all_day: false,
        location,
        audience: plain_text_opt(text(record, "audience")),
        description: plain_text_opt(text(record, "description")),
        full_description: plain_text_opt(text(record, "full_description")),
        link,
        categories: categories(record),
        organizer: plain_text_opt(text(record, "organizer")),
    };
    event.refresh_derived();

    Ok(event)
}

/// A trimmed, non-empty string value.
fn text<'a>(record: &'a RawRecord, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn time_field(
    record: &RawRecord,
    field: &'static str,
    title: &str,
    issues: &mut Vec<DataIssue>,
) -> Option<NaiveTime> {
    let raw = text(record, field)?;
    let parsed = parse_time(raw);
    if parsed.is_none() {
        note(
            issues,
            DataIssue::BadTime {
                title: title.to_string(),
                field,
                value: raw.to_string(),
            },
        );
    }
    parsed
}

pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

fn categories(record: &RawRecord) -> Vec<String> {
    let Some(values) = record.get("categories").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut categories: Vec<String> = Vec::with_capacity(values.len());
    for category in values.iter().filter_map(Value::as_str).map(plain_text) {
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}
