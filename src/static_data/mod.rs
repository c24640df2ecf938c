//! Immutable in-memory GTFS static tables.
//!
//! [`StaticScheduleStore`] holds one optional vector per GTFS file. A `None`
//! table was missing or unreadable; every query over it behaves as if the
//! table were empty.

mod loader;
mod raw;

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::calendar::{CalendarException, CalendarRule, resolve_active_services};
use crate::departures::parse_service_time;

#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub route_id: String,
    pub short_name: String,
    pub long_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    pub headsign: Option<String>,
}

/// One `stop_times.txt` row. Times are kept verbatim since GTFS allows
/// hours past 24; see [`parse_service_time`].
#[derive(Debug, Clone, Serialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_sequence: u32,
}

impl StopTime {
    pub fn departure_seconds(&self) -> Option<u32> {
        parse_service_time(&self.departure_time)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Stop {
    pub stop_id: String,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct StaticScheduleStore {
    pub routes: Option<Vec<Route>>,
    pub trips: Option<Vec<Trip>>,
    pub stop_times: Option<Vec<StopTime>>,
    pub stops: Option<Vec<Stop>>,
    pub calendar: Option<Vec<CalendarRule>>,
    pub calendar_dates: Option<Vec<CalendarException>>,
}

impl StaticScheduleStore {
    pub fn routes(&self) -> &[Route] {
        self.routes.as_deref().unwrap_or_default()
    }

    pub fn trips(&self) -> &[Trip] {
        self.trips.as_deref().unwrap_or_default()
    }

    pub fn stop_times(&self) -> &[StopTime] {
        self.stop_times.as_deref().unwrap_or_default()
    }

    pub fn stops(&self) -> &[Stop] {
        self.stops.as_deref().unwrap_or_default()
    }

    pub fn calendar(&self) -> &[CalendarRule] {
        self.calendar.as_deref().unwrap_or_default()
    }

    pub fn calendar_dates(&self) -> &[CalendarException] {
        self.calendar_dates.as_deref().unwrap_or_default()
    }

    /// Service ids running on `date`. Absent calendar tables contribute nothing.
    pub fn active_services(&self, date: NaiveDate) -> HashSet<String> {
        resolve_active_services(self.calendar(), self.calendar_dates(), date)
    }

    /// Maps every trip id to its route id.
    pub fn trip_to_route(&self) -> HashMap<String, String> {
        self.trips()
            .iter()
            .map(|t| (t.trip_id.clone(), t.route_id.clone()))
            .collect()
    }

    /// Maps every stop id to its display name.
    pub fn stop_names(&self) -> HashMap<&str, &str> {
        self.stops()
            .iter()
            .map(|s| (s.stop_id.as_str(), s.name.as_str()))
            .collect()
    }

    pub fn stop_name<'a>(&'a self, stop_id: &'a str) -> &'a str {
        self.stops()
            .iter()
            .find(|s| s.stop_id == stop_id)
            .map_or(stop_id, |s| s.name.as_str())
    }

    /// Routes whose short name or id contains `query`, ignoring case.
    pub fn find_routes(&self, query: &str) -> Vec<&Route> {
        let q = query.trim().to_lowercase();
        self.routes()
            .iter()
            .filter(|r| {
                r.short_name.to_lowercase().contains(&q) || r.route_id.to_lowercase().contains(&q)
            })
            .collect()
    }

    /// Stops whose name contains `query`, ignoring case, without duplicates.
    pub fn find_stops_by_name(&self, query: &str) -> Vec<&Stop> {
        let q = query.trim().to_lowercase();
        let mut seen = HashSet::new();
        self.stops()
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&q))
            .filter(|s| seen.insert((s.stop_id.as_str(), s.name.as_str())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, short: &str) -> Route {
        Route {
            route_id: id.to_string(),
            short_name: short.to_string(),
            long_name: String::new(),
        }
    }

    fn stop(id: &str, name: &str) -> Stop {
        Stop {
            stop_id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_absent_tables_read_as_empty() {
        let store = StaticScheduleStore::default();
        assert!(store.trips().is_empty());
        assert!(store.trip_to_route().is_empty());
        assert!(store.find_routes("1").is_empty());
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert!(store.active_services(date).is_empty());
    }

    #[test]
    fn test_find_routes_matches_short_name_or_id() {
        let store = StaticScheduleStore {
            routes: Some(vec![route("R109", "109"), route("R6", "6"), route("N31", "31")]),
            ..Default::default()
        };

        let ids: Vec<_> = store.find_routes("109").iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(ids, ["R109"]);

        let ids: Vec<_> = store.find_routes("n3").iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(ids, ["N31"]);

        assert!(store.find_routes("999").is_empty());
    }

    #[test]
    fn test_find_stops_by_name_dedups() {
        let store = StaticScheduleStore {
            stops: Some(vec![
                stop("100", "Glavni kolodvor"),
                stop("100", "Glavni kolodvor"),
                stop("101", "Glavni kolodvor"),
                stop("200", "Trg bana Jelačića"),
            ]),
            ..Default::default()
        };

        let found = store.find_stops_by_name("glavni");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].stop_id, "100");
        assert_eq!(found[1].stop_id, "101");
    }

    #[test]
    fn test_stop_name_falls_back_to_id() {
        let store = StaticScheduleStore {
            stops: Some(vec![stop("100", "Glavni kolodvor")]),
            ..Default::default()
        };
        assert_eq!(store.stop_name("100"), "Glavni kolodvor");
        assert_eq!(store.stop_name("999"), "999");
    }
}
