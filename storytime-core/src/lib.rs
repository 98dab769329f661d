pub mod age;
mod error;
pub mod filter;
pub mod markup;
pub mod normalize;
pub mod store;
mod structs;
pub mod venue;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use filter::{filter, filter_today, CityChoice, FilterCriteria, Filtered, Relaxed};
pub use markup::plain_text;
pub use structs::{format_clock, weekday_name, City, Event, Location, LocationTable, VenueType};
pub use venue::{branches_for, map_markers, resolve_location};
