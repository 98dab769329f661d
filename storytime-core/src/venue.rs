//! Resolution of free-text venue names against the static location table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{filter::CityChoice, Event, Location, LocationTable};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'a> {
    pub name: &'a str,
    pub location: &'a Location,
}

/// Finds the table entry for an event's venue.
///
/// The venue name is tried first, then the branch, then the location text.
/// Each is matched exactly, then case-insensitively, then by containment in
/// either direction. Among several containment candidates the one sharing the
/// longest text wins; ties go to the shorter table key, then to the key that
/// sorts first.
#[must_use]
pub fn resolve_location<'a>(event: &Event, table: &'a LocationTable) -> Option<Resolved<'a>> {
    [
        Some(event.venue_name.as_str()),
        event.branch.as_deref(),
        event.location.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find_map(|name| resolve_name(name, table))
}

#[must_use]
pub fn resolve_name<'a>(name: &str, table: &'a LocationTable) -> Option<Resolved<'a>> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if let Some((key, location)) = table.get_key_value(name) {
        return Some(Resolved { name: key, location });
    }

    let folded = name.to_lowercase();
    if let Some((key, location)) = table.iter().find(|(key, _)| key.to_lowercase() == folded) {
        return Some(Resolved { name: key, location });
    }

    table
        .iter()
        .filter_map(|(key, location)| {
            let candidate = key.to_lowercase();
            let shared = if folded.contains(&candidate) {
                candidate.chars().count()
            } else if candidate.contains(&folded) {
                folded.chars().count()
            } else {
                return None;
            };
            Some((shared, key, location))
        })
        .max_by(|(a_shared, a_key, _), (b_shared, b_key, _)| {
            a_shared
                .cmp(b_shared)
                .then_with(|| b_key.len().cmp(&a_key.len()))
                .then_with(|| b_key.cmp(a_key))
        })
        .map(|(_, key, location)| Resolved { name: key, location })
}

/// Venue names of one city (or both), grouped by venue type and sorted.
pub type BranchGroups = BTreeMap<String, Vec<String>>;

#[must_use]
pub fn branches_for(table: &LocationTable, city: CityChoice) -> BranchGroups {
    let mut groups = BranchGroups::new();

    for (name, location) in table {
        let admitted = match city {
            CityChoice::Both => true,
            CityChoice::Only(_) => location.city().is_some_and(|c| city.includes(c)),
        };
        if admitted {
            groups
                .entry(location.kind.clone())
                .or_default()
                .push(name.clone());
        }
    }

    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub venue: String,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapView {
    pub markers: Vec<Marker>,
    /// Events whose venue matched no table entry.
    pub unplaced: usize,
}

/// Groups events under the table entry their venue resolves to, keeping
/// event order within each marker. Markers are ordered by venue name.
#[must_use]
pub fn map_markers(events: &[Event], table: &LocationTable) -> MapView {
    let mut markers: BTreeMap<&str, Marker> = BTreeMap::new();
    let mut unplaced = 0;

    for event in events {
        let Some(resolved) = resolve_location(event, table) else {
            unplaced += 1;
            continue;
        };

        markers
            .entry(resolved.name)
            .or_insert_with(|| Marker {
                venue: resolved.name.to_string(),
                lat: resolved.location.lat,
                lng: resolved.location.lng,
                address: resolved.location.address.clone(),
                kind: resolved.location.kind.clone(),
                events: Vec::new(),
            })
            .events
            .push(event.clone());
    }

    MapView {
        markers: markers.into_values().collect(),
        unplaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{event, location},
        City,
    };

    fn table(entries: &[(&str, &str, &str)]) -> LocationTable {
        entries
            .iter()
            .map(|(name, city, kind)| (name.to_string(), location(city, kind)))
            .collect()
    }

    fn resolved_name(event: &Event, table: &LocationTable) -> Option<String> {
        resolve_location(event, table).map(|resolved| resolved.name.to_string())
    }

    #[test]
    fn substring_match_resolves_room_names() {
        let table = table(&[("Main Library", "Jersey City", "library")]);
        let mut e = event("Storytime", "2025-10-25");
        e.venue_name = "Main Library - Children's Room".into();

        assert_eq!(resolved_name(&e, &table).as_deref(), Some("Main Library"));
    }

    #[test]
    fn exact_and_case_insensitive_matches_win() {
        let table = table(&[
            ("Pavonia Branch", "Jersey City", "library"),
            ("Pavonia Branch Annex", "Jersey City", "library"),
        ]);
        let mut e = event("Storytime", "2025-10-25");

        e.venue_name = "Pavonia Branch".into();
        assert_eq!(resolved_name(&e, &table).as_deref(), Some("Pavonia Branch"));

        e.venue_name = "pavonia branch annex".into();
        assert_eq!(
            resolved_name(&e, &table).as_deref(),
            Some("Pavonia Branch Annex")
        );
    }

    #[test]
    fn longest_shared_text_wins_among_candidates() {
        let table = table(&[
            ("Library", "Jersey City", "library"),
            ("Five Corners Branch", "Jersey City", "library"),
        ]);
        let mut e = event("Storytime", "2025-10-25");
        e.venue_name = "Five Corners Branch Library, 2nd floor".into();

        assert_eq!(
            resolved_name(&e, &table).as_deref(),
            Some("Five Corners Branch")
        );
    }

    #[test]
    fn ties_go_to_the_shortest_key() {
        let table = table(&[
            ("Hoboken Public Library", "Hoboken", "library"),
            ("Main Library", "Jersey City", "library"),
            ("Zeta Library", "Jersey City", "library"),
        ]);
        let mut e = event("Storytime", "2025-10-25");
        e.venue_name = "library".into();

        assert_eq!(resolved_name(&e, &table).as_deref(), Some("Main Library"));
    }

    #[test]
    fn falls_back_to_branch_then_location() {
        let table = table(&[("West Bergen Branch", "Jersey City", "library")]);
        let mut e = event("Storytime", "2025-10-25");
        e.venue_name = "Jersey City Free Public Library".into();
        e.location = Some("West Bergen Branch, Meeting Room".into());

        assert_eq!(
            resolved_name(&e, &table).as_deref(),
            Some("West Bergen Branch")
        );

        e.location = None;
        e.branch = Some("Heights Branch".into());
        assert_eq!(resolved_name(&e, &table), None);
    }

    #[test]
    fn branches_are_partitioned_by_city() {
        let table = table(&[
            ("Hoboken Public Library", "Hoboken", "library"),
            ("Little City Books", "Hoboken", "bookstore"),
            ("Pavonia Branch", "Jersey City", "library"),
            ("WORD Bookstore", "Jersey City", "bookstore"),
        ]);

        let hoboken = branches_for(&table, CityChoice::Only(City::Hoboken));
        assert_eq!(hoboken["library"], vec!["Hoboken Public Library"]);
        assert_eq!(hoboken["bookstore"], vec!["Little City Books"]);
        assert!(hoboken
            .values()
            .flatten()
            .all(|name| name != "Pavonia Branch" && name != "WORD Bookstore"));

        let both = branches_for(&table, CityChoice::Both);
        assert_eq!(both["library"].len(), 2);
        assert_eq!(both["bookstore"].len(), 2);
    }

    #[test]
    fn markers_group_events_by_resolved_venue() {
        let table = table(&[
            ("Hoboken Public Library", "Hoboken", "library"),
            ("Main Library", "Jersey City", "library"),
        ]);
        let mut first = event("First", "2025-10-25");
        first.venue_name = "Main Library".into();
        let mut second = event("Second", "2025-10-26");
        second.venue_name = "Main Library - Auditorium".into();
        let mut hoboken = event("Hoboken", "2025-10-26");
        hoboken.venue_name = "Hoboken Public Library".into();
        let mut nowhere = event("Nowhere", "2025-10-26");
        nowhere.venue_name = "Bookmobile".into();

        let view = map_markers(&[first, second, hoboken, nowhere], &table);

        assert_eq!(view.unplaced, 1);
        assert_eq!(view.markers.len(), 2);
        assert_eq!(view.markers[0].venue, "Hoboken Public Library");
        let titles = view.markers[1]
            .events
            .iter()
            .map(|e| e.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["First", "Second"]);
    }
}
