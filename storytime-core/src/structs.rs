use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum City {
    #[serde(rename = "Jersey City")]
    JerseyCity,
    #[serde(rename = "Hoboken")]
    Hoboken,
}

impl City {
    pub const ALL: [City; 2] = [City::JerseyCity, City::Hoboken];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            City::JerseyCity => "Jersey City",
            City::Hoboken => "Hoboken",
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            City::JerseyCity => "jersey_city",
            City::Hoboken => "hoboken",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts both the slug (`jersey_city`) and the display label (`Jersey City`).
impl FromStr for City {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "jersey_city" | "jc" => Ok(City::JerseyCity),
            "hoboken" => Ok(City::Hoboken),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueType {
    Library,
    Bookstore,
}

impl FromStr for VenueType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "library" => Ok(VenueType::Library),
            "bookstore" => Ok(VenueType::Bookstore),
            _ => Err(()),
        }
    }
}

/// A normalized story-time event as held in the combined store.
///
/// Optional fields use `null` for "the source did not say"; they are never
/// set to an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub city: City,
    pub venue_type: VenueType,
    pub venue_name: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub day_of_week: String,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub formatted_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub formatted_end_time: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
    pub link: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
}

/// Events lasting this long are treated as drop-in, all-day events.
pub const ALL_DAY_HOURS: f64 = 6.0;

impl Event {
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    /// Recomputes every field that is derived from `date`, `start_time` and
    /// `end_time`.
    pub fn refresh_derived(&mut self) {
        self.day_of_week = weekday_name(self.date.weekday()).to_string();
        self.formatted_time = self.start_time.map(format_clock);
        self.formatted_end_time = self.end_time.map(format_clock);
        self.duration_hours = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end > start => {
                Some((end - start).num_minutes() as f64 / 60.0)
            }
            _ => None,
        };
        self.is_all_day = self.start_time.is_none()
            || self.duration_hours.is_some_and(|hours| hours >= ALL_DAY_HOURS);
    }

    /// Sort key: date, then all-day events, then start time.
    #[must_use]
    pub fn sort_key(&self) -> (NaiveDate, Option<NaiveTime>) {
        let time = if self.is_all_day { None } else { self.start_time };
        (self.date, time)
    }
}

#[must_use]
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// 12-hour clock display, e.g. `9:05 AM`.
#[must_use]
pub fn format_clock(time: NaiveTime) -> String {
    let (pm, hour) = time.hour12();
    format!(
        "{}:{:02} {}",
        hour,
        time.minute(),
        if pm { "PM" } else { "AM" }
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub city: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Location {
    #[must_use]
    pub fn city(&self) -> Option<City> {
        self.city.parse().ok()
    }
}

pub type LocationTable = BTreeMap<String, Location>;
