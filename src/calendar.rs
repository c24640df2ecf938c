//! Service calendar resolution.
//!
//! Implements GTFS `calendar.txt` and `calendar_dates.txt` semantics: a weekly
//! base pattern bounded by a validity window, overridden per date by added
//! and removed exceptions. A removal always wins over an addition for the
//! same service and date.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::HashSet;

/// Lower bound used when a rule has no usable `start_date`.
pub const EARLIEST_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1900, 1, 1) {
    Some(d) => d,
    None => panic!("invalid sentinel date"),
};

/// Upper bound used when a rule has no usable `end_date`.
pub const LATEST_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2900, 12, 31) {
    Some(d) => d,
    None => panic!("invalid sentinel date"),
};

/// Seven weekday bits, Monday in bit 0 through Sunday in bit 6.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    pub fn set(&mut self, weekday: Weekday) {
        self.0 |= 1 << weekday.num_days_from_monday();
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_monday()) != 0
    }

    /// Builds a mask from the seven `calendar.txt` day columns, Monday first.
    pub fn from_days(days: [bool; 7]) -> Self {
        let mut mask = Self::default();
        for (weekday, on) in WEEK.iter().zip(days) {
            if on {
                mask.set(*weekday);
            }
        }
        mask
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Weekly service pattern from `calendar.txt`.
///
/// `None` bounds mean the column was empty or unparsable; they never exclude
/// a date.
#[derive(Clone, Debug)]
pub struct CalendarRule {
    pub service_id: String,
    pub weekdays: WeekdayMask,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CalendarRule {
    /// Whether the weekly pattern alone puts this service on `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        let start = self.start_date.unwrap_or(EARLIEST_DATE);
        let end = self.end_date.unwrap_or(LATEST_DATE);
        start <= date && date <= end && self.weekdays.contains(date.weekday())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ExceptionKind {
    Added,
    Removed,
}

impl ExceptionKind {
    /// Maps the GTFS `exception_type` column (1 = added, 2 = removed).
    pub fn from_gtfs(value: &str) -> Option<Self> {
        match value.trim() {
            "1" => Some(ExceptionKind::Added),
            "2" => Some(ExceptionKind::Removed),
            _ => None,
        }
    }
}

/// Single dated override from `calendar_dates.txt`.
///
/// A `None` date came from an unparsable column and matches no target date.
#[derive(Clone, Debug)]
pub struct CalendarException {
    pub service_id: String,
    pub date: Option<NaiveDate>,
    pub kind: ExceptionKind,
}

/// Parses a GTFS `YYYYMMDD` date, returning `None` for blank or malformed input.
pub fn parse_gtfs_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d").ok()
}

/// Returns the service ids active on `date`.
///
/// The result is `(base ∪ added) \ removed`, where `base` is every rule whose
/// window and weekday cover the date and `added`/`removed` come from the
/// exceptions dated exactly `date`.
pub fn resolve_active_services(
    rules: &[CalendarRule],
    exceptions: &[CalendarException],
    date: NaiveDate,
) -> HashSet<String> {
    let mut active: HashSet<String> = rules
        .iter()
        .filter(|r| r.covers(date))
        .map(|r| r.service_id.clone())
        .collect();

    let todays = || exceptions.iter().filter(move |e| e.date == Some(date));

    active.extend(
        todays()
            .filter(|e| e.kind == ExceptionKind::Added)
            .map(|e| e.service_id.clone()),
    );
    for removed in todays().filter(|e| e.kind == ExceptionKind::Removed) {
        active.remove(&removed.service_id);
    }

    active
}
