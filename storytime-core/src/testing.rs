use chrono::{NaiveDate, NaiveTime};

use crate::{City, Event, Location, VenueType};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// A timed Jersey City library event at 10:30 with no optional data.
pub fn event(title: &str, on: &str) -> Event {
    let mut event = Event {
        title: title.to_string(),
        city: City::JerseyCity,
        venue_type: VenueType::Library,
        venue_name: "Priscilla Gardner Main Library".to_string(),
        branch: None,
        date: date(on),
        day_of_week: String::new(),
        start_time: NaiveTime::from_hms_opt(10, 30, 0),
        formatted_time: None,
        end_time: None,
        formatted_end_time: None,
        duration_hours: None,
        is_all_day: false,
        location: None,
        audience: None,
        description: None,
        full_description: None,
        link: format!("https://example.org/{}", title.replace(' ', "-")),
        categories: Vec::new(),
        organizer: None,
    };
    event.refresh_derived();
    event
}

pub fn location(city: &str, kind: &str) -> Location {
    Location {
        lat: 40.72,
        lng: -74.05,
        address: format!("1 Test St, {city}, NJ"),
        city: city.to_string(),
        kind: kind.to_string(),
    }
}
