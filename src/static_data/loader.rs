//! Reads a directory of GTFS text files into a [`StaticScheduleStore`].

use std::fs::File;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::raw::{RawCalendar, RawCalendarDate, RawRoute, RawStop, RawStopTime, RawTrip};
use super::{Route, StaticScheduleStore, Stop, StopTime, Trip};
use crate::calendar::{CalendarException, CalendarRule, ExceptionKind, WeekdayMask, parse_gtfs_date};
use crate::error::LoadError;

impl StaticScheduleStore {
    /// Loads every known GTFS table found in `dir`.
    ///
    /// A missing or unreadable file leaves its table absent instead of failing
    /// the whole load.
    #[tracing::instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load_dir(dir: &Path) -> Self {
        let store = StaticScheduleStore {
            routes: load_table(dir, "routes", |r: RawRoute| Some(r.into())),
            trips: load_table(dir, "trips", |r: RawTrip| Some(r.into())),
            stop_times: load_table(dir, "stop_times", stop_time_from_raw),
            stops: load_table(dir, "stops", |r: RawStop| Some(r.into())),
            calendar: load_table(dir, "calendar", calendar_from_raw),
            calendar_dates: load_table(dir, "calendar_dates", exception_from_raw),
        };

        info!(
            routes = store.routes().len(),
            trips = store.trips().len(),
            stop_times = store.stop_times().len(),
            stops = store.stops().len(),
            "Static schedule loaded"
        );
        store
    }
}

fn load_table<R, T, F>(dir: &Path, name: &str, convert: F) -> Option<Vec<T>>
where
    R: DeserializeOwned,
    F: Fn(R) -> Option<T>,
{
    let path = dir.join(format!("{name}.txt"));
    if !path.exists() {
        debug!(table = name, path = %path.display(), "GTFS table not present");
        return None;
    }

    match read_rows::<R>(&path) {
        Ok((rows, skipped)) => {
            let total = rows.len();
            let converted: Vec<T> = rows.into_iter().filter_map(convert).collect();
            let skipped = skipped + (total - converted.len());
            if skipped > 0 {
                warn!(table = name, skipped, "Skipped malformed GTFS rows");
            }
            debug!(table = name, rows = converted.len(), "GTFS table loaded");
            Some(converted)
        }
        Err(e) => {
            warn!(table = name, error = %e, "GTFS table unavailable");
            None
        }
    }
}

/// Deserializes every row of a CSV file, returning the good rows and the
/// number of rows that failed to deserialize.
fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<(Vec<R>, usize), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    rdr.headers().map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    let mut skipped = 0;
    for result in rdr.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(_) => skipped += 1,
        }
    }

    Ok((rows, skipped))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

impl From<RawRoute> for Route {
    fn from(r: RawRoute) -> Self {
        Route {
            route_id: r.route_id,
            short_name: r.route_short_name,
            long_name: r.route_long_name,
        }
    }
}

impl From<RawTrip> for Trip {
    fn from(r: RawTrip) -> Self {
        Trip {
            trip_id: r.trip_id,
            route_id: r.route_id,
            service_id: r.service_id,
            headsign: non_empty(r.trip_headsign),
        }
    }
}

impl From<RawStop> for Stop {
    fn from(r: RawStop) -> Self {
        let name = if r.stop_name.is_empty() {
            r.stop_id.clone()
        } else {
            r.stop_name
        };
        Stop {
            stop_id: r.stop_id,
            name,
        }
    }
}

fn calendar_from_raw(r: RawCalendar) -> Option<CalendarRule> {
    if r.service_id.is_empty() {
        return None;
    }
    let on = |v: &str| v == "1";
    Some(CalendarRule {
        weekdays: WeekdayMask::from_days([
            on(&r.monday),
            on(&r.tuesday),
            on(&r.wednesday),
            on(&r.thursday),
            on(&r.friday),
            on(&r.saturday),
            on(&r.sunday),
        ]),
        start_date: parse_gtfs_date(&r.start_date),
        end_date: parse_gtfs_date(&r.end_date),
        service_id: r.service_id,
    })
}

fn stop_time_from_raw(r: RawStopTime) -> Option<StopTime> {
    let stop_sequence = r.stop_sequence.parse().ok()?;
    Some(StopTime {
        trip_id: r.trip_id,
        stop_id: r.stop_id,
        arrival_time: r.arrival_time,
        departure_time: r.departure_time,
        stop_sequence,
    })
}

fn exception_from_raw(r: RawCalendarDate) -> Option<CalendarException> {
    if r.service_id.is_empty() {
        return None;
    }
    let kind = ExceptionKind::from_gtfs(&r.exception_type)?;
    Some(CalendarException {
        date: parse_gtfs_date(&r.date),
        service_id: r.service_id,
        kind,
    })
}
