//! Per-trip stop sequences for one route on one service day.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::static_data::{Stop, StopTime, Trip};

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledStop {
    pub stop_id: String,
    pub stop_name: String,
    pub arrival: String,
    pub departure: String,
    pub sequence: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripSchedule {
    pub trip_id: String,
    pub headsign: Option<String>,
    pub stops: Vec<ScheduledStop>,
}

/// Departure of one indexed trip from a stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopVisit<'a> {
    pub trip_id: &'a str,
    pub departure: &'a str,
    pub sequence: u32,
}

/// Ordered trip schedules for a route plus a stop → visits lookup.
#[derive(Debug, Default)]
pub struct ScheduleIndex {
    trips: Vec<TripSchedule>,
}

impl ScheduleIndex {
    /// Builds the schedules of every trip of `route_id`.
    ///
    /// An empty `active_services` applies no calendar filter; otherwise only
    /// trips whose service id is in the set are kept. Trips appear in
    /// `trips.txt` order and their stops in `stop_sequence` order. Without
    /// any stop times the index is empty.
    pub fn build(
        route_id: &str,
        active_services: &HashSet<String>,
        trips: &[Trip],
        stop_times: &[StopTime],
        stops: &[Stop],
    ) -> Self {
        let selected: Vec<&Trip> = trips
            .iter()
            .filter(|t| t.route_id == route_id)
            .filter(|t| active_services.is_empty() || active_services.contains(&t.service_id))
            .collect();
        if selected.is_empty() || stop_times.is_empty() {
            return Self::default();
        }

        let wanted: HashSet<&str> = selected.iter().map(|t| t.trip_id.as_str()).collect();
        let mut times_by_trip: HashMap<&str, Vec<&StopTime>> = HashMap::new();
        for st in stop_times.iter().filter(|st| wanted.contains(st.trip_id.as_str())) {
            times_by_trip.entry(st.trip_id.as_str()).or_default().push(st);
        }

        let stop_names: HashMap<&str, &str> = stops
            .iter()
            .map(|s| (s.stop_id.as_str(), s.name.as_str()))
            .collect();

        let trips = selected
            .into_iter()
            .map(|trip| {
                let mut times = times_by_trip.remove(trip.trip_id.as_str()).unwrap_or_default();
                times.sort_by_key(|st| st.stop_sequence);

                let stops = times
                    .into_iter()
                    .map(|st| ScheduledStop {
                        stop_id: st.stop_id.clone(),
                        stop_name: stop_names
                            .get(st.stop_id.as_str())
                            .map_or_else(|| st.stop_id.clone(), |n| n.to_string()),
                        arrival: st.arrival_time.clone(),
                        departure: st.departure_time.clone(),
                        sequence: st.stop_sequence,
                    })
                    .collect();

                TripSchedule {
                    trip_id: trip.trip_id.clone(),
                    headsign: trip.headsign.clone(),
                    stops,
                }
            })
            .collect();

        Self { trips }
    }

    pub fn trips(&self) -> &[TripSchedule] {
        &self.trips
    }

    pub fn into_trips(self) -> Vec<TripSchedule> {
        self.trips
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Groups every indexed visit by stop id, in trip then sequence order.
    pub fn departures_by_stop(&self) -> HashMap<&str, Vec<StopVisit<'_>>> {
        let mut by_stop: HashMap<&str, Vec<StopVisit<'_>>> = HashMap::new();
        for trip in &self.trips {
            for stop in &trip.stops {
                by_stop.entry(stop.stop_id.as_str()).or_default().push(StopVisit {
                    trip_id: &trip.trip_id,
                    departure: &stop.departure,
                    sequence: stop.sequence,
                });
            }
        }
        by_stop
    }
}
