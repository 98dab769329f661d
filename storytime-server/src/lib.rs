pub mod cli;
pub mod ingest;
pub mod routes;
pub mod store;

use storytime_core::LocationTable;

pub use routes::router;
pub use store::{EventStore, RefreshError};

pub struct AppState {
    pub events: EventStore,
    pub locations: LocationTable,
}
