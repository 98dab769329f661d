use std::{collections::HashSet, str::FromStr};

use chrono::{Days, Local, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    age::{audience_matches, AgeRange},
    City, Event, VenueType,
};

/// Search input as submitted by the front end.
///
/// Every field is optional and free-form. Values that cannot be understood
/// never reject a search: the affected criterion is dropped and reported in
/// [`Filtered::relaxed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub city: String,
    pub venue_type: String,
    pub branches: Vec<String>,
    pub kids_ages: String,
    pub event_type: String,
    pub date_range: String,
    pub days: Vec<String>,
    pub time_of_day: Vec<String>,
}

/// A criterion that was ignored because its value could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relaxed {
    pub criterion: &'static str,
    pub value: String,
}

impl FilterCriteria {
    /// Reads criteria from a loosely typed JSON body one field at a time.
    ///
    /// A field of the wrong shape is left unrestricted and reported, while
    /// the other fields still apply. `null` counts as absent, and numbers are
    /// taken as their text (`"kids_ages": 3` asks for age 3). A single string
    /// is accepted where a list is expected.
    #[must_use]
    pub fn from_json(body: &Value) -> (Self, Vec<Relaxed>) {
        let mut relaxed = Vec::new();

        let Value::Object(fields) = body else {
            relaxed.push(Relaxed {
                criterion: "body",
                value: body.to_string(),
            });
            return (Self::default(), relaxed);
        };

        let criteria = Self {
            city: text_field(fields, "city", &mut relaxed),
            venue_type: text_field(fields, "venue_type", &mut relaxed),
            branches: list_field(fields, "branches", &mut relaxed),
            kids_ages: text_field(fields, "kids_ages", &mut relaxed),
            event_type: text_field(fields, "event_type", &mut relaxed),
            date_range: text_field(fields, "date_range", &mut relaxed),
            days: list_field(fields, "days", &mut relaxed),
            time_of_day: list_field(fields, "time_of_day", &mut relaxed),
        };

        (criteria, relaxed)
    }
}

fn text_field(
    fields: &Map<String, Value>,
    criterion: &'static str,
    relaxed: &mut Vec<Relaxed>,
) -> String {
    match fields.get(criterion) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => value.to_string(),
        Some(value) => {
            relaxed.push(Relaxed {
                criterion,
                value: value.to_string(),
            });
            String::new()
        }
    }
}

fn list_field(
    fields: &Map<String, Value>,
    criterion: &'static str,
    relaxed: &mut Vec<Relaxed>,
) -> Vec<String> {
    match fields.get(criterion) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(text)) => vec![text.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Null => None,
                other => {
                    relaxed.push(Relaxed {
                        criterion,
                        value: other.to_string(),
                    });
                    None
                }
            })
            .collect(),
        Some(value) => {
            relaxed.push(Relaxed {
                criterion,
                value: value.to_string(),
            });
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filtered {
    pub events: Vec<Event>,
    pub relaxed: Vec<Relaxed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityChoice {
    Only(City),
    Both,
}

impl FromStr for CityChoice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "both" | "all" => Ok(CityChoice::Both),
            other => other.parse().map(CityChoice::Only),
        }
    }
}

impl CityChoice {
    #[must_use]
    pub fn includes(self, city: City) -> bool {
        match self {
            CityChoice::Only(only) => only == city,
            CityChoice::Both => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Morning before noon, afternoon until 17:00, evening after.
    #[must_use]
    pub fn of(time: NaiveTime) -> Self {
        match time.hour() {
            0..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EventType {
    Keywords(&'static [&'static str]),
    FreeText(String),
}

const EVENT_TYPES: &[(&str, &[&str])] = &[
    ("storytime", &["storytime", "storytimes"]),
    ("arts", &["art", "arts", "craft", "crafts"]),
    ("steam", &["steam", "stem"]),
    ("music", &["music", "musical", "dance", "dancing"]),
];

/// `criteria` interpreted into typed restrictions. `None` means unrestricted.
#[derive(Debug, Default)]
struct Plan {
    city: Option<City>,
    venue_type: Option<VenueType>,
    branches: HashSet<String>,
    ages: Option<AgeRange>,
    event_type: Option<EventType>,
    horizon_days: Option<u64>,
    days: HashSet<Weekday>,
    time_of_day: Vec<TimeOfDay>,
}

impl Plan {
    fn from_criteria(criteria: &FilterCriteria) -> (Self, Vec<Relaxed>) {
        let mut plan = Plan::default();
        let mut relaxed = Vec::new();
        let mut relax = |criterion: &'static str, value: &str| {
            debug!(criterion, value, "ignoring unusable search criterion");
            relaxed.push(Relaxed {
                criterion,
                value: value.to_string(),
            });
        };

        match criteria.city.parse::<CityChoice>() {
            Ok(CityChoice::Only(city)) => plan.city = Some(city),
            Ok(CityChoice::Both) => {}
            Err(()) => relax("city", &criteria.city),
        }

        match criteria.venue_type.trim() {
            "" => {}
            value if value.eq_ignore_ascii_case("all") => {}
            value => match value.parse::<VenueType>() {
                Ok(venue_type) => plan.venue_type = Some(venue_type),
                Err(()) => relax("venue_type", value),
            },
        }

        plan.branches = criteria
            .branches
            .iter()
            .map(|branch| fold(branch))
            .filter(|branch| !branch.is_empty())
            .collect();

        match criteria.kids_ages.trim() {
            "" => {}
            value => match AgeRange::parse(value) {
                Some(range) => plan.ages = Some(range),
                None => relax("kids_ages", value),
            },
        }

        let event_type = criteria.event_type.trim().to_ascii_lowercase();
        if !(event_type.is_empty() || event_type == "all") {
            plan.event_type = EVENT_TYPES
                .iter()
                .find(|(name, _)| *name == squash(&event_type))
                .map(|(_, keywords)| EventType::Keywords(*keywords))
                .or_else(|| Some(EventType::FreeText(squash(&event_type))))
                .filter(|kind| kind != &EventType::FreeText(String::new()));
        }

        match criteria.date_range.trim().to_ascii_lowercase().as_str() {
            "" | "all" => {}
            "week" => plan.horizon_days = Some(7),
            "2weeks" | "two_weeks" => plan.horizon_days = Some(14),
            "month" => plan.horizon_days = Some(30),
            _ => relax("date_range", &criteria.date_range),
        }

        // Unknown entries are dropped one by one; the recognised ones still apply.
        for day in criteria.days.iter().map(|day| day.trim()).filter(|day| !day.is_empty()) {
            match day.parse::<Weekday>() {
                Ok(weekday) => {
                    plan.days.insert(weekday);
                }
                Err(_) => relax("days", day),
            }
        }

        for slot in criteria
            .time_of_day
            .iter()
            .map(|slot| slot.trim())
            .filter(|slot| !slot.is_empty())
        {
            match slot.parse::<TimeOfDay>() {
                Ok(slot) => plan.time_of_day.push(slot),
                Err(()) => relax("time_of_day", slot),
            }
        }

        (plan, relaxed)
    }

    fn admits(&self, event: &Event, today: NaiveDate) -> bool {
        if event.date < today {
            return false;
        }

        if let Some(days) = self.horizon_days {
            if today.checked_add_days(Days::new(days)).is_some_and(|last| event.date > last) {
                return false;
            }
        }

        if self.city.is_some_and(|city| city != event.city) {
            return false;
        }

        if self.venue_type.is_some_and(|venue_type| venue_type != event.venue_type) {
            return false;
        }

        if !self.branches.is_empty() {
            let branch = event.branch.as_deref().map(fold);
            if !(self.branches.contains(&fold(&event.venue_name))
                || branch.is_some_and(|branch| self.branches.contains(&branch)))
            {
                return false;
            }
        }

        if !self.days.is_empty() && !self.days.contains(&event.weekday()) {
            return false;
        }

        if !self.time_of_day.is_empty() {
            // Untimed events are available whenever the visitor is.
            if let Some(start) = event.start_time {
                if !self.time_of_day.contains(&TimeOfDay::of(start)) {
                    return false;
                }
            }
        }

        if let Some(kind) = &self.event_type {
            if !matches_event_type(event, kind) {
                return false;
            }
        }

        if let Some(ages) = self.ages {
            if !audience_matches(event, ages) {
                return false;
            }
        }

        true
    }
}

/// Filters, de-duplicates and sorts `events` for one search.
///
/// Past events (before `today`) are always excluded. Results are ordered by
/// date, with all-day events first on each date, then by start time.
#[must_use]
pub fn filter(events: &[Event], criteria: &FilterCriteria, today: NaiveDate) -> Filtered {
    let (plan, relaxed) = Plan::from_criteria(criteria);

    let mut seen = HashSet::new();
    let mut events = events
        .iter()
        .filter(|event| plan.admits(event, today))
        .filter(|event| seen.insert(dedup_key(event)))
        .cloned()
        .collect::<Vec<_>>();

    events.sort_by_key(Event::sort_key);

    Filtered { events, relaxed }
}

/// [`filter`] against the server's local date.
#[must_use]
pub fn filter_today(events: &[Event], criteria: &FilterCriteria) -> Filtered {
    filter(events, criteria, Local::now().date_naive())
}

fn dedup_key(event: &Event) -> (String, NaiveDate, Option<NaiveTime>, String) {
    (
        fold(&event.title),
        event.date,
        event.start_time,
        fold(&event.venue_name),
    )
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Lower-cased alphanumerics only, so `Story Time` and `story-time` compare equal.
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '.' || c == '\''))
        .map(squash)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Matches whole words, or two adjacent words written together.
fn has_keyword(text: &str, keywords: &[&str]) -> bool {
    let tokens = tokens(text);
    tokens.iter().any(|token| keywords.contains(&token.as_str()))
        || tokens
            .windows(2)
            .any(|pair| keywords.contains(&format!("{}{}", pair[0], pair[1]).as_str()))
}

fn matches_event_type(event: &Event, kind: &EventType) -> bool {
    let texts = event
        .categories
        .iter()
        .map(String::as_str)
        .chain([event.title.as_str()])
        .chain(event.description.as_deref());

    match kind {
        EventType::Keywords(keywords) => texts.into_iter().any(|text| has_keyword(text, keywords)),
        EventType::FreeText(needle) => texts
            .into_iter()
            .any(|text| squash(text).contains(needle.as_str())),
    }
}
