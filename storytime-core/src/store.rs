//! Reading and writing the combined store and the location table.

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    normalize::{note, DataIssue, DropReason},
    structs::weekday_name,
    Error, Event, Location, LocationTable, Result,
};

const ORIGIN: &str = "combined store";

#[derive(Debug, Clone, Default)]
pub struct LoadedEvents {
    pub events: Vec<Event>,
    pub issues: Vec<DataIssue>,
}

impl LoadedEvents {
    /// Records left out of `events`; other issues were corrected in place.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| matches!(issue, DataIssue::Dropped { .. }))
            .count()
    }
}

/// Parses the combined store: a JSON array of normalized events.
///
/// The document itself must be a well-formed array; individual records that
/// do not fit the event schema, or that lack a title or link, are dropped and
/// reported. Derived fields are recomputed so `day_of_week` always agrees
/// with `date`.
pub fn parse_events<S: AsRef<str>>(s: S) -> Result<LoadedEvents> {
    let Value::Array(values) = serde_json::from_str::<Value>(s.as_ref())? else {
        return Err(Error::InvalidStore("expected a JSON array of events".into()));
    };

    let mut loaded = LoadedEvents::default();

    for (index, value) in values.into_iter().enumerate() {
        let mut event = match serde_json::from_value::<Event>(value) {
            Ok(event) => event,
            Err(err) => {
                drop_record(&mut loaded.issues, index, DropReason::Malformed(err.to_string()));
                continue;
            }
        };

        if event.title.trim().is_empty() {
            drop_record(&mut loaded.issues, index, DropReason::MissingTitle);
            continue;
        }
        if event.link.trim().is_empty() {
            drop_record(&mut loaded.issues, index, DropReason::MissingLink);
            continue;
        }

        let actual = weekday_name(event.weekday());
        if !event.day_of_week.is_empty() && !event.day_of_week.eq_ignore_ascii_case(actual) {
            note(
                &mut loaded.issues,
                DataIssue::WeekdayMismatch {
                    title: event.title.clone(),
                    date: event.date,
                    recorded: event.day_of_week.clone(),
                    actual,
                },
            );
        }
        event.refresh_derived();

        loaded.events.push(event);
    }

    info!(
        events = loaded.events.len(),
        issues = loaded.issues.len(),
        "parsed combined store"
    );

    Ok(loaded)
}

fn drop_record(issues: &mut Vec<DataIssue>, index: usize, reason: DropReason) {
    note(
        issues,
        DataIssue::Dropped {
            origin: ORIGIN.to_string(),
            index,
            reason,
        },
    );
}

/// Parses the location table: a JSON object keyed by venue name.
///
/// Entries that do not fit the location schema (a venue that failed to
/// geocode has no `lat`/`lng`) are skipped and logged; the rest of the table
/// stays usable.
pub fn parse_locations<S: AsRef<str>>(s: S) -> Result<LocationTable> {
    let Value::Object(entries) = serde_json::from_str::<Value>(s.as_ref())? else {
        return Err(Error::InvalidStore("expected a JSON object of locations".into()));
    };

    let mut table = LocationTable::new();
    for (name, value) in entries {
        match serde_json::from_value::<Location>(value) {
            Ok(location) => {
                table.insert(name, location);
            }
            Err(err) => warn!(venue = %name, "skipping location entry: {err}"),
        }
    }

    Ok(table)
}

pub fn to_store_json(events: &[Event]) -> Result<String> {
    Ok(serde_json::to_string_pretty(events)?)
}
