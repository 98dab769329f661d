//! Age matching between a requested age span and free-text audience data.
//!
//! Library feeds describe their audience in prose ("Early Childhood (0-5)",
//! "Walking to 2 years", "for ages 4-18"), so this is a keyword and pattern
//! heuristic, not a structured range comparison:
//!
//! 1. an audience saying "all ages" always matches;
//! 2. age ranges found in the description decide, matching if any overlaps;
//! 3. otherwise ranges in the audience decide the same way, so a listing like
//!    "Early Childhood (0-5), Children (6-11)" admits either span;
//! 4. otherwise known keywords in the audience or title map to typical spans;
//! 5. events with no age information at all do not match.
//!
//! Spans that start below one year ("Walking to 2 years", "18 months to 3
//! years") are read as starting at the walking age or the whole year.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Event;

static REQUEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:ages?\s*)?(\d{1,2})\s*(?:(?:-|–|to)\s*(\d{1,2}))?\s*$")
        .expect("valid age request regex")
});

static DESCRIPTION_RES: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)\bages?\s+(\d{1,2})\s*(?:-|–|to)\s*(\d{1,2})")
            .expect("valid description age regex"),
        Regex::new(r"(?i)\b(\d{1,2})\s*(?:-|–)\s*(\d{1,2})\s*years?\s+old")
            .expect("valid years-old regex"),
    ]
});

static AUDIENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s*(?:-|–|to)\s*(\d{1,2})").expect("valid audience regex"));

static INFANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:walk(?:ing|ers)|(\d{1,2})\s*(?:months?|mos?)\.?)\s*(?:-|–|to)\s*(\d{1,2})\s*(?:years?|yrs?)\b",
    )
    .expect("valid infant span regex")
});

const WALKING_AGE: u8 = 1;

static KEYWORD_RES: Lazy<Vec<(Regex, AgeRange)>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .map(|(keyword, range)| {
            let re = Regex::new(&format!(r"(?i)\b{}(?:s|ers|d)?\b", regex::escape(keyword)))
                .expect("valid keyword regex");
            (re, *range)
        })
        .collect()
});

const KEYWORDS: &[(&str, AgeRange)] = &[
    ("baby", AgeRange::new(0, 2)),
    ("babies", AgeRange::new(0, 2)),
    ("infant", AgeRange::new(0, 2)),
    ("lap sit", AgeRange::new(0, 2)),
    ("toddler", AgeRange::new(1, 3)),
    ("preschool", AgeRange::new(3, 5)),
    ("pre-k", AgeRange::new(3, 5)),
    ("early childhood", AgeRange::new(0, 5)),
    ("kindergarten", AgeRange::new(5, 6)),
    ("school age", AgeRange::new(6, 11)),
    ("tween", AgeRange::new(9, 12)),
    ("teen", AgeRange::new(13, 18)),
];

/// An inclusive span of ages in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    #[must_use]
    pub const fn new(min: u8, max: u8) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Parses a requested span such as `0-5`, `3 to 5`, `ages 2-3` or `4`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let caps = REQUEST_RE.captures(s)?;
        let min = caps.get(1)?.as_str().parse().ok()?;
        let max = match caps.get(2) {
            Some(max) => max.as_str().parse().ok()?,
            None => min,
        };
        Some(Self::new(min, max))
    }

    #[must_use]
    pub fn overlaps(self, other: AgeRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

fn range_from(caps: regex::Captures<'_>) -> Option<AgeRange> {
    let min = caps.get(1)?.as_str().parse().ok()?;
    let max = caps.get(2)?.as_str().parse().ok()?;
    Some(AgeRange::new(min, max))
}

fn infant_spans(text: &str) -> impl Iterator<Item = AgeRange> + '_ {
    INFANT_RE.captures_iter(text).filter_map(|caps| {
        let min = match caps.get(1) {
            Some(months) => months.as_str().parse::<u8>().ok()? / 12,
            None => WALKING_AGE,
        };
        let max = caps.get(2)?.as_str().parse().ok()?;
        Some(AgeRange::new(min, max))
    })
}

/// Every span mentioned in `text`, infant phrasings included.
fn spans_in<'r, I>(text: &str, patterns: I) -> Vec<AgeRange>
where
    I: IntoIterator<Item = &'r Regex>,
{
    infant_spans(text)
        .chain(
            patterns
                .into_iter()
                .flat_map(|re| re.captures_iter(text).filter_map(range_from)),
        )
        .collect()
}

fn keyword_range(text: &str) -> Option<AgeRange> {
    KEYWORD_RES
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, range)| *range)
}

#[must_use]
pub fn audience_matches(event: &Event, wanted: AgeRange) -> bool {
    let audience = event.audience.as_deref().unwrap_or_default();

    if audience.to_lowercase().contains("all ages") {
        return true;
    }

    if let Some(description) = event.description.as_deref() {
        let spans = spans_in(description, DESCRIPTION_RES.iter());
        if !spans.is_empty() {
            return spans.iter().any(|span| span.overlaps(wanted));
        }
    }

    let spans = spans_in(audience, [&*AUDIENCE_RE]);
    if !spans.is_empty() {
        return spans.iter().any(|span| span.overlaps(wanted));
    }

    keyword_range(audience)
        .or_else(|| keyword_range(&event.title))
        .is_some_and(|range| range.overlaps(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::event;

    fn with_audience(audience: &str) -> Event {
        let mut e = event("Storytime", "2025-10-25");
        e.audience = Some(audience.to_string());
        e
    }

    #[test]
    fn parses_requested_spans() {
        assert_eq!(AgeRange::parse("0-5"), Some(AgeRange::new(0, 5)));
        assert_eq!(AgeRange::parse(" 3 to 5 "), Some(AgeRange::new(3, 5)));
        assert_eq!(AgeRange::parse("Ages 2-3"), Some(AgeRange::new(2, 3)));
        assert_eq!(AgeRange::parse("4"), Some(AgeRange::new(4, 4)));
        assert_eq!(AgeRange::parse("5-2"), Some(AgeRange::new(2, 5)));
        assert_eq!(AgeRange::parse("toddlers"), None);
        assert_eq!(AgeRange::parse(""), None);
    }

    #[test]
    fn known_audience_phrasings() {
        let early = with_audience("Early Childhood (0-5)");
        let children = with_audience("Children (6-11)");

        assert!(audience_matches(&early, AgeRange::new(0, 5)));
        assert!(audience_matches(&early, AgeRange::new(3, 8)));
        assert!(!audience_matches(&early, AgeRange::new(6, 11)));

        assert!(audience_matches(&children, AgeRange::new(6, 11)));
        assert!(audience_matches(&children, AgeRange::new(5, 6)));
        assert!(!audience_matches(&children, AgeRange::new(0, 5)));
    }

    #[test]
    fn all_ages_always_matches() {
        let e = with_audience("All Ages");
        assert!(audience_matches(&e, AgeRange::new(0, 1)));
        assert!(audience_matches(&e, AgeRange::new(12, 14)));
    }

    #[test]
    fn description_range_takes_precedence() {
        let mut e = with_audience("Early Childhood (0-5)");
        e.description = Some("A hands-on robotics lab for ages 8-12.".into());

        assert!(!audience_matches(&e, AgeRange::new(0, 5)));
        assert!(audience_matches(&e, AgeRange::new(10, 10)));
    }

    #[test]
    fn keywords_cover_untagged_feeds() {
        let mut e = event("Toddler Tales", "2025-10-25");
        assert!(audience_matches(&e, AgeRange::new(2, 3)));
        assert!(!audience_matches(&e, AgeRange::new(6, 11)));

        e.title = "Baby Lap Sit".into();
        assert!(audience_matches(&e, AgeRange::new(0, 1)));
        assert!(!audience_matches(&e, AgeRange::new(4, 5)));
    }

    #[test]
    fn any_listed_audience_range_matches() {
        let e = with_audience("Early Childhood (0-5), Children (6-11)");

        assert!(audience_matches(&e, AgeRange::new(6, 11)));
        assert!(audience_matches(&e, AgeRange::new(8, 8)));
        assert!(audience_matches(&e, AgeRange::new(2, 2)));
        assert!(!audience_matches(&e, AgeRange::new(13, 15)));
    }

    #[test]
    fn walking_and_month_spans() {
        let mut ballet = with_audience("Walking to 2 years");
        ballet.title = "Tiny Dancers Ballet - Level 1 (FREE)".into();

        assert!(audience_matches(&ballet, AgeRange::new(1, 2)));
        assert!(audience_matches(&ballet, AgeRange::new(0, 5)));
        assert!(!audience_matches(&ballet, AgeRange::new(3, 5)));

        let months = with_audience("18 months to 3 years");
        assert!(audience_matches(&months, AgeRange::new(1, 1)));
        assert!(audience_matches(&months, AgeRange::new(3, 4)));
        assert!(!audience_matches(&months, AgeRange::new(5, 8)));
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let mut e = event("Canteen Cooking Club", "2025-10-25");
        assert!(!audience_matches(&e, AgeRange::new(13, 15)));

        e.title = "Thirteen Ways to Fold Paper".into();
        assert!(!audience_matches(&e, AgeRange::new(13, 15)));

        e.title = "Teens Craft Night".into();
        assert!(audience_matches(&e, AgeRange::new(13, 15)));

        e.title = "Stories for Toddlers".into();
        assert!(audience_matches(&e, AgeRange::new(2, 2)));
    }

    #[test]
    fn events_without_age_information_do_not_match() {
        let e = event("Chess Club", "2025-10-25");
        assert!(!audience_matches(&e, AgeRange::new(0, 5)));
    }
}
