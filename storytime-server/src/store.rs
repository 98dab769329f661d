use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Local};
use storytime_core::{store, City, Event, LocationTable, VenueType};
use thiserror::Error;
use tokio::{
    fs,
    sync::{Mutex, RwLock},
};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("a refresh is already running")]
    InProgress,
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Core(#[from] storytime_core::Error),
}

/// One immutable load of the combined store.
#[derive(Debug)]
pub struct Snapshot {
    pub events: Vec<Event>,
    pub dropped: usize,
    pub loaded_at: DateTime<Local>,
}

impl Snapshot {
    pub fn count_where<F: Fn(&Event) -> bool>(&self, predicate: F) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }

    pub fn city_count(&self, city: City) -> usize {
        self.count_where(|e| e.city == city)
    }

    pub fn bookstore_count(&self) -> usize {
        self.count_where(|e| e.venue_type == VenueType::Bookstore)
    }
}

/// The combined store as served. Searches read whichever snapshot is current;
/// a refresh builds a full replacement before swapping it in.
pub struct EventStore {
    path: PathBuf,
    current: RwLock<Arc<Snapshot>>,
    refresh_guard: Mutex<()>,
}

impl EventStore {
    /// Loads the initial snapshot. Failing here is fatal to the server.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, RefreshError> {
        let path = path.into();
        let snapshot = load_snapshot(&path).await?;

        Ok(Self {
            path,
            current: RwLock::new(Arc::new(snapshot)),
            refresh_guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Re-reads the store file and swaps it in. On failure the previous
    /// snapshot stays current.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let Ok(_guard) = self.refresh_guard.try_lock() else {
            return Err(RefreshError::InProgress);
        };

        let snapshot = Arc::new(load_snapshot(&self.path).await?);
        *self.current.write().await = Arc::clone(&snapshot);

        info!(
            events = snapshot.events.len(),
            dropped = snapshot.dropped,
            "swapped in refreshed snapshot"
        );

        Ok(snapshot)
    }
}

async fn load_snapshot(path: &Path) -> Result<Snapshot, RefreshError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| RefreshError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let loaded = store::parse_events(text)?;
    let dropped = loaded.dropped();

    Ok(Snapshot {
        events: loaded.events,
        dropped,
        loaded_at: Local::now(),
    })
}

/// Reads the static location table. A missing or broken table is not fatal:
/// the server runs without map markers or branch lists.
pub async fn load_locations(path: &Path) -> LocationTable {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), "location table unavailable: {err}");
            return LocationTable::new();
        }
    };

    match store::parse_locations(text) {
        Ok(table) => {
            info!(locations = table.len(), "loaded location table");
            table
        }
        Err(err) => {
            warn!(path = %path.display(), "location table unreadable: {err}");
            LocationTable::new()
        }
    }
}
