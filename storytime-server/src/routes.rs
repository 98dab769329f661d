use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use storytime_core::{
    branches_for, filter_today, map_markers,
    venue::{BranchGroups, MapView},
    City, CityChoice, Event, FilterCriteria, Relaxed,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{AppState, RefreshError};

type SharedState = Arc<AppState>;

const NO_RESULTS: &str = "No story times match these preferences. \
    Try a longer date range, more days of the week, or another city.";

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/search", post(search))
        .route("/map", post(map))
        .route("/refresh", post(refresh))
        .route("/branches/:city", get(branches))
        .route("/locations", get(locations))
        .route("/health", get(|| async { "OK" }))
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found") })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// An empty body means no preferences. A body that is not JSON is treated
/// the same way and reported back as relaxed; inside a JSON body each field
/// is read on its own.
fn criteria_from(body: &[u8]) -> (FilterCriteria, Vec<Relaxed>) {
    if body.iter().all(u8::is_ascii_whitespace) {
        return (FilterCriteria::default(), Vec::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value) => FilterCriteria::from_json(&value),
        Err(err) => {
            warn!("ignoring malformed search body: {err}");
            let relaxed = Relaxed {
                criterion: "body",
                value: err.to_string(),
            };
            (FilterCriteria::default(), vec![relaxed])
        }
    }
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<Event>,
    count: usize,
    user_preferences: FilterCriteria,
    relaxed: Vec<Relaxed>,
    message: Option<&'static str>,
}

async fn search(State(state): State<SharedState>, body: Bytes) -> Json<SearchResponse> {
    let (criteria, mut relaxed) = criteria_from(&body);
    let snapshot = state.events.snapshot().await;

    let filtered = filter_today(&snapshot.events, &criteria);
    relaxed.extend(filtered.relaxed);
    let count = filtered.events.len();

    info!(count, "search");

    Json(SearchResponse {
        results: filtered.events,
        count,
        user_preferences: criteria,
        relaxed,
        message: (count == 0).then_some(NO_RESULTS),
    })
}

#[derive(Serialize)]
struct MapResponse {
    #[serde(flatten)]
    view: MapView,
    count: usize,
    user_preferences: FilterCriteria,
    relaxed: Vec<Relaxed>,
}

async fn map(State(state): State<SharedState>, body: Bytes) -> Json<MapResponse> {
    let (criteria, mut relaxed) = criteria_from(&body);
    let snapshot = state.events.snapshot().await;

    let filtered = filter_today(&snapshot.events, &criteria);
    relaxed.extend(filtered.relaxed);
    let view = map_markers(&filtered.events, &state.locations);

    Json(MapResponse {
        view,
        count: filtered.events.len(),
        user_preferences: criteria,
        relaxed,
    })
}

#[derive(Serialize)]
struct RefreshResponse {
    status: &'static str,
    count: usize,
    jersey_city_count: usize,
    hoboken_count: usize,
    bookstore_count: usize,
    dropped: usize,
    loaded_at: String,
}

async fn refresh(State(state): State<SharedState>) -> Response {
    match state.events.refresh().await {
        Ok(snapshot) => Json(RefreshResponse {
            status: "ok",
            count: snapshot.events.len(),
            jersey_city_count: snapshot.city_count(City::JerseyCity),
            hoboken_count: snapshot.city_count(City::Hoboken),
            bookstore_count: snapshot.bookstore_count(),
            dropped: snapshot.dropped,
            loaded_at: snapshot.loaded_at.to_rfc3339(),
        })
        .into_response(),
        Err(err @ RefreshError::InProgress) => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "error", "message": err.to_string() })),
        )
            .into_response(),
        Err(err) => {
            error!(path = %state.events.path().display(), "refresh failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": err.to_string() })),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct BranchesResponse {
    city: String,
    branches: BranchGroups,
}

async fn branches(State(state): State<SharedState>, Path(city): Path<String>) -> Response {
    let Ok(choice) = city.parse::<CityChoice>() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown city '{city}'") })),
        )
            .into_response();
    };

    let city = match choice {
        CityChoice::Only(city) => city.label().to_string(),
        CityChoice::Both => "all".to_string(),
    };

    Json(BranchesResponse {
        city,
        branches: branches_for(&state.locations, choice),
    })
    .into_response()
}

async fn locations(State(state): State<SharedState>) -> Response {
    Json(&state.locations).into_response()
}
