//! Upcoming departures at a stop, relative to a query time.
//!
//! GTFS times are seconds since the start of the service day and may exceed
//! 24 hours, so a trip leaving at `24:05:00` sorts after same-day evening
//! departures instead of wrapping to the morning.

use chrono::{NaiveTime, Timelike};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::static_data::{StopTime, Trip};

/// Departures up to this many seconds in the past are still reported.
pub const LOOKBACK_SECONDS: i64 = 300;

/// Maximum number of departures returned by [`upcoming`].
pub const MAX_DEPARTURES: usize = 50;

/// Delta assigned to departures whose time could not be parsed.
pub const UNPARSABLE_DELTA: i64 = 999_999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Departure {
    /// `None` when the stop time references a trip missing from `trips.txt`.
    pub route_id: Option<String>,
    pub trip_id: String,
    pub departure_hhmm: String,
    pub delta_seconds: i64,
}

/// Parses a GTFS service time (`HH:MM:SS` or `HH:MM`) into seconds since the
/// start of the service day. Hours of 24 and above are accepted; values too
/// large to represent are rejected.
pub fn parse_service_time(value: &str) -> Option<u32> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h, m, *s),
        [h, m] => (h, m, "0"),
        _ => return None,
    };
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    let s: u32 = s.trim().parse().ok()?;
    h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(s)
}

/// Renders service-day seconds as `HH:MM` without wrapping past midnight.
pub fn format_hhmm(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

fn seconds_since_midnight(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

/// Lists departures from `stop_id` no earlier than five minutes before
/// `query_time`, soonest first, at most [`MAX_DEPARTURES`] rows.
///
/// An empty `active_services` applies no calendar filter. Otherwise a stop
/// time is kept only when its trip's service id is in the set.
pub fn upcoming(
    stop_id: &str,
    query_time: NaiveTime,
    stop_times: &[StopTime],
    trips: &[Trip],
    active_services: &HashSet<String>,
) -> Vec<Departure> {
    let query_seconds = seconds_since_midnight(query_time);
    let trips_by_id: HashMap<&str, &Trip> = trips.iter().map(|t| (t.trip_id.as_str(), t)).collect();

    let mut departures: Vec<Departure> = stop_times
        .iter()
        .filter(|st| st.stop_id == stop_id)
        .filter_map(|st| {
            let trip = trips_by_id.get(st.trip_id.as_str()).copied();
            if !active_services.is_empty() && !trip.is_some_and(|t| active_services.contains(&t.service_id)) {
                return None;
            }

            let departure = st.departure_seconds();
            let delta = departure.map_or(UNPARSABLE_DELTA, |d| i64::from(d) - query_seconds);
            Some(Departure {
                route_id: trip.map(|t| t.route_id.clone()),
                trip_id: st.trip_id.clone(),
                departure_hhmm: departure.map_or_else(|| "-".to_string(), format_hhmm),
                delta_seconds: delta,
            })
        })
        .filter(|d| d.delta_seconds >= -LOOKBACK_SECONDS)
        .collect();

    departures.sort_by_key(|d| d.delta_seconds);
    departures.truncate(MAX_DEPARTURES);
    departures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop_time(trip_id: &str, stop_id: &str, departure: &str) -> StopTime {
        StopTime {
            trip_id: trip_id.to_string(),
            stop_id: stop_id.to_string(),
            arrival_time: departure.to_string(),
            departure_time: departure.to_string(),
            stop_sequence: 1,
        }
    }

    fn trip(trip_id: &str, route_id: &str, service_id: &str) -> Trip {
        Trip {
            trip_id: trip_id.to_string(),
            route_id: route_id.to_string(),
            service_id: service_id.to_string(),
            headsign: None,
        }
    }

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_parse_service_time() {
        assert_eq!(parse_service_time("25:10:00"), Some(90600));
        assert_eq!(parse_service_time("08:05:00"), Some(29100));
        assert_eq!(parse_service_time("8:05:00"), Some(29100));
        assert_eq!(parse_service_time("08:05"), Some(29100));
        assert_eq!(parse_service_time("24:05:00"), Some(86700));
        assert_eq!(parse_service_time(""), None);
        assert_eq!(parse_service_time("08"), None);
        assert_eq!(parse_service_time("ab:cd:ef"), None);
        assert_eq!(parse_service_time("1:2:3:4"), None);
        assert_eq!(parse_service_time("9999999:00:00"), None);
        assert_eq!(parse_service_time("1193046:28:16"), None);
    }

    #[test]
    fn test_format_hhmm_does_not_wrap() {
        assert_eq!(format_hhmm(29100), "08:05");
        assert_eq!(format_hhmm(86700), "24:05");
        assert_eq!(format_hhmm(0), "00:00");
    }

    #[test]
    fn test_lookback_window_and_ordering() {
        let stop_times = vec![
            stop_time("late", "S", "08:30:00"),
            stop_time("just_left", "S", "07:55:00"),
            stop_time("too_old", "S", "07:54:59"),
            stop_time("soon", "S", "08:01:00"),
            stop_time("other_stop", "X", "08:02:00"),
        ];
        let trips = vec![trip("late", "R1", "A"), trip("just_left", "R1", "A"), trip("soon", "R2", "A")];

        let deps = upcoming("S", hms(8, 0, 0), &stop_times, &trips, &HashSet::new());

        let got: Vec<_> = deps.iter().map(|d| (d.trip_id.as_str(), d.delta_seconds)).collect();
        assert_eq!(got, [("just_left", -300), ("soon", 60), ("late", 1800)]);
        assert_eq!(deps[1].route_id.as_deref(), Some("R2"));
        assert_eq!(deps[1].departure_hhmm, "08:01");
    }

    #[test]
    fn test_after_midnight_departure_sorts_last() {
        let stop_times = vec![stop_time("night", "S", "24:05:00"), stop_time("morning", "S", "06:15:00")];
        let trips = vec![trip("night", "N1", "A"), trip("morning", "R1", "A")];

        let deps = upcoming("S", hms(0, 0, 0), &stop_times, &trips, &HashSet::new());

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].trip_id, "morning");
        assert_eq!(deps[1].trip_id, "night");
        assert_eq!(deps[1].delta_seconds, 86700);
        assert_eq!(deps[1].departure_hhmm, "24:05");
    }

    #[test]
    fn test_active_services_filter() {
        let stop_times = vec![
            stop_time("weekday", "S", "09:00:00"),
            stop_time("sunday", "S", "09:10:00"),
            stop_time("orphan", "S", "09:20:00"),
        ];
        let trips = vec![trip("weekday", "R1", "WK"), trip("sunday", "R1", "SU")];
        let active: HashSet<String> = ["WK".to_string()].into();

        let deps = upcoming("S", hms(8, 0, 0), &stop_times, &trips, &active);
        let ids: Vec<_> = deps.iter().map(|d| d.trip_id.as_str()).collect();
        assert_eq!(ids, ["weekday"]);

        // Without a calendar filter, the unknown trip is kept with no route
        let deps = upcoming("S", hms(8, 0, 0), &stop_times, &trips, &HashSet::new());
        assert_eq!(deps.len(), 3);
        assert_eq!(deps[2].route_id, None);
    }

    #[test]
    fn test_unparsable_time_sorts_last() {
        let stop_times = vec![stop_time("broken", "S", "soon"), stop_time("ok", "S", "23:00:00")];
        let trips = vec![trip("broken", "R1", "A"), trip("ok", "R1", "A")];

        let deps = upcoming("S", hms(8, 0, 0), &stop_times, &trips, &HashSet::new());

        assert_eq!(deps[0].trip_id, "ok");
        assert_eq!(deps[1].delta_seconds, UNPARSABLE_DELTA);
        assert_eq!(deps[1].departure_hhmm, "-");
    }

    #[test]
    fn test_out_of_range_hours_get_sentinel_delta() {
        let stop_times = vec![stop_time("huge", "S", "9999999:00:00"), stop_time("ok", "S", "08:10:00")];

        let deps = upcoming("S", hms(0, 0, 0), &stop_times, &[], &HashSet::new());

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].trip_id, "ok");
        assert_eq!(deps[1].trip_id, "huge");
        assert_eq!(deps[1].delta_seconds, UNPARSABLE_DELTA);
        assert_eq!(deps[1].departure_hhmm, "-");
    }

    #[test]
    fn test_truncates_to_limit() {
        let stop_times: Vec<_> = (0..80)
            .map(|i| stop_time(&format!("T{i}"), "S", &format!("10:{:02}:00", i % 60)))
            .collect();

        let deps = upcoming("S", hms(9, 0, 0), &stop_times, &[], &HashSet::new());

        assert_eq!(deps.len(), MAX_DEPARTURES);
        assert!(deps.windows(2).all(|w| w[0].delta_seconds <= w[1].delta_seconds));
    }

    #[test]
    fn test_unknown_stop_is_empty() {
        let stop_times = vec![stop_time("T", "S", "10:00:00")];
        assert!(upcoming("nope", hms(9, 0, 0), &stop_times, &[], &HashSet::new()).is_empty());
    }
}
