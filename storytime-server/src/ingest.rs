//! The `normalize` command: fetcher output files in, combined store out.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use storytime_core::{
    normalize::{normalize_all, raw_records_from_json, RawRecord, Source},
    store::{parse_events, to_store_json},
    City, Event, VenueType,
};
use tokio::fs;
use tracing::{info, warn};

use crate::cli::NormalizeArgs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub written: usize,
    pub refreshed: Vec<City>,
    /// Previous records kept for sources that were not re-read.
    pub carried_over: usize,
    pub dropped: usize,
}

pub async fn run(args: &NormalizeArgs) -> anyhow::Result<IngestSummary> {
    let inputs = [
        (City::JerseyCity, args.jersey_city.as_deref()),
        (City::Hoboken, args.hoboken.as_deref()),
    ];

    let mut loaded: Vec<(Source, Vec<RawRecord>)> = Vec::new();
    for (city, path) in inputs {
        let Some(path) = path else {
            continue;
        };
        match read_records(path).await {
            Ok(records) => loaded.push((Source::library_for(city), records)),
            Err(err) => warn!(%city, "skipping source, keeping previous records: {err:#}"),
        }
    }

    if loaded.is_empty() {
        bail!(
            "no fetcher output could be read, leaving {} untouched",
            args.output.display()
        );
    }

    let report = normalize_all(loaded.iter().map(|(source, records)| (source, records.as_slice())));
    let dropped = report.dropped();

    let refreshed: Vec<(City, VenueType)> = loaded
        .iter()
        .map(|(source, _)| (source.city, source.venue_type))
        .collect();

    let carried = previous_events(&args.output)
        .await
        .into_iter()
        .filter(|event| !refreshed.contains(&(event.city, event.venue_type)))
        .collect::<Vec<_>>();
    let carried_over = carried.len();

    let mut events = report.events;
    events.extend(carried);

    write_store(&args.output, &events).await?;

    let summary = IngestSummary {
        written: events.len(),
        refreshed: refreshed.into_iter().map(|(city, _)| city).collect(),
        carried_over,
        dropped,
    };

    info!(
        output = %args.output.display(),
        written = summary.written,
        carried_over = summary.carried_over,
        dropped = summary.dropped,
        "wrote combined store"
    );

    Ok(summary)
}

async fn read_records(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    raw_records_from_json(text).with_context(|| format!("failed to parse {}", path.display()))
}

async fn previous_events(path: &Path) -> Vec<Event> {
    let Ok(text) = fs::read_to_string(path).await else {
        return Vec::new();
    };

    match parse_events(text) {
        Ok(loaded) => loaded.events,
        Err(err) => {
            warn!(path = %path.display(), "previous combined store unreadable: {err}");
            Vec::new()
        }
    }
}

/// Writes next to the target and renames over it so readers never see a
/// partial file.
async fn write_store(path: &Path, events: &[Event]) -> anyhow::Result<()> {
    let json = to_store_json(events)?;

    let mut staging = PathBuf::from(path);
    staging.as_mut_os_string().push(".partial");

    fs::write(&staging, json)
        .await
        .with_context(|| format!("failed to write {}", staging.display()))?;
    fs::rename(&staging, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))?;

    Ok(())
}
