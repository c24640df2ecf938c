//! Row shapes of the GTFS text files as they appear on disk.
//!
//! Every column is read as a string and missing columns default to empty, so
//! a file with unusual column sets still loads. Conversion into the typed
//! domain rows happens in [`super::loader`].

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawRoute {
    pub route_id: String,
    pub route_short_name: String,
    pub route_long_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawTrip {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub trip_headsign: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawStopTime {
    pub trip_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_id: String,
    pub stop_sequence: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawStop {
    pub stop_id: String,
    pub stop_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawCalendar {
    pub service_id: String,
    pub monday: String,
    pub tuesday: String,
    pub wednesday: String,
    pub thursday: String,
    pub friday: String,
    pub saturday: String,
    pub sunday: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawCalendarDate {
    pub service_id: String,
    pub date: String,
    pub exception_type: String,
}
