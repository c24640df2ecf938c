//! Human-readable and JSON rendering of query results.
//!
//! Every `describe_*` function returns plain lines; printing is left to the
//! binary.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::correlate::CorrelationMatch;
use crate::departures::Departure;
use crate::fleet::{FleetVehicle, model_for};
use crate::gtfs_rt::trip_update::StopTimeEvent;
use crate::gtfs_rt::{TripUpdate, VehiclePosition};
use crate::schedule::TripSchedule;
use crate::stats::SnapshotStats;

/// Converts a POSIX timestamp into local time in `tz`.
pub fn epoch_to_local(secs: i64, tz: Tz) -> Option<DateTime<Tz>> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.with_timezone(&tz))
}

fn event_hhmm(event: Option<&StopTimeEvent>, tz: Tz) -> String {
    event
        .and_then(|e| e.time)
        .filter(|t| *t != 0)
        .and_then(|t| epoch_to_local(t, tz))
        .map_or_else(|| "-".to_string(), |dt| dt.format("%H:%M").to_string())
}

pub fn describe_trip_update(tu: &TripUpdate, stop_names: &HashMap<&str, &str>, tz: Tz) -> Vec<String> {
    let mut lines = vec![format!(
        "Trip {} | route {}",
        tu.trip.trip_id.as_deref().unwrap_or("-"),
        tu.trip.route_id.as_deref().unwrap_or("-"),
    )];

    for stu in &tu.stop_time_update {
        let stop_id = stu.stop_id.as_deref().unwrap_or("-");
        let stop_name = stop_names.get(stop_id).copied().unwrap_or(stop_id);
        let seq = stu.stop_sequence.map_or_else(|| "-".to_string(), |s| s.to_string());
        let delay = stu
            .arrival
            .as_ref()
            .and_then(|a| a.delay)
            .map_or_else(|| "-".to_string(), |d| format!("{d}s"));

        lines.push(format!(
            "    {stop_name} ({stop_id}) | seq {seq} | arrival {} | departure {} | delay {delay}",
            event_hhmm(stu.arrival.as_ref(), tz),
            event_hhmm(stu.departure.as_ref(), tz),
        ));
    }

    lines
}

pub fn describe_vehicle(veh: &VehiclePosition, roster: &[FleetVehicle], tz: Tz) -> Vec<String> {
    let mut lines = Vec::new();
    let vehicle_id = veh.vehicle.as_ref().and_then(|d| d.id.as_deref()).filter(|id| !id.is_empty());

    if let Some(trip) = &veh.trip {
        lines.push(format!(
            "trip_id: {} | route: {}",
            trip.trip_id.as_deref().unwrap_or("-"),
            trip.route_id.as_deref().unwrap_or("-"),
        ));
    }

    if let Some(id) = vehicle_id {
        match model_for(roster, id) {
            Some(model) => lines.push(format!("Vehicle {id} | model {model}")),
            None => lines.push(format!("Vehicle {id}")),
        }
    }

    if let Some(pos) = &veh.position {
        lines.push(format!(
            "Position {:.5},{:.5} | speed {} | stop {}",
            pos.latitude,
            pos.longitude,
            pos.speed.map_or_else(|| "-".to_string(), |s| format!("{s:.1}")),
            veh.stop_id.as_deref().unwrap_or("-"),
        ));
    }

    if let Some(seq) = veh.current_stop_sequence {
        lines.push(format!("Current stop seq {seq}"));
    }

    if let Some(ts) = veh.timestamp.filter(|t| *t != 0) {
        if let Some(dt) = i64::try_from(ts).ok().and_then(|t| epoch_to_local(t, tz)) {
            lines.push(format!("Updated {}", dt.format("%Y-%m-%d %H:%M:%S")));
        }
    }

    lines
}

pub fn describe_departures(departures: &[Departure]) -> Vec<String> {
    departures
        .iter()
        .map(|d| {
            format!(
                " route {} trip {} dep {} delta {}s",
                d.route_id.as_deref().unwrap_or("-"),
                d.trip_id,
                d.departure_hhmm,
                d.delta_seconds
            )
        })
        .collect()
}

pub fn describe_trip_schedule(trip: &TripSchedule) -> String {
    format!(
        " trip {} headsign {} stops {}",
        trip.trip_id,
        trip.headsign.as_deref().unwrap_or("-"),
        trip.stops.len()
    )
}

/// Serializable projection of a [`CorrelationMatch`].
#[derive(Debug, Serialize)]
pub struct MatchView<'a> {
    pub entity_id: &'a str,
    pub trip_id: Option<&'a str>,
    pub vehicle_id: Option<&'a str>,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub stop_ids: Vec<&'a str>,
}

impl<'a> From<&CorrelationMatch<'a>> for MatchView<'a> {
    fn from(m: &CorrelationMatch<'a>) -> Self {
        let position = m.vehicle.and_then(|v| v.position.as_ref());
        MatchView {
            entity_id: m.entity_id,
            trip_id: m.trip_id,
            vehicle_id: m
                .vehicle
                .and_then(|v| v.vehicle.as_ref())
                .and_then(|d| d.id.as_deref()),
            latitude: position.map(|p| p.latitude),
            longitude: position.map(|p| p.longitude),
            stop_ids: m
                .trip_update
                .map(|tu| {
                    tu.stop_time_update
                        .iter()
                        .filter_map(|s| s.stop_id.as_deref())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Logs snapshot statistics using Rust's debug pretty-print format.
pub fn log_snapshot(stats: &SnapshotStats) {
    debug!("{:#?}", stats);
}

/// Prints any result as pretty JSON on stdout.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::trip_update::StopTimeUpdate;
    use crate::gtfs_rt::{Position, TripDescriptor, VehicleDescriptor};

    const ZAGREB: Tz = chrono_tz::Europe::Zagreb;

    #[test]
    fn test_epoch_to_local() {
        // 2024-06-10T06:00:00Z is 08:00 in Zagreb (CEST)
        let dt = epoch_to_local(1718000000 - 1718000000 % 3600, ZAGREB).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-06-10");
        assert_eq!(dt.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn test_describe_trip_update_resolves_names() {
        let tu = TripUpdate {
            trip: TripDescriptor {
                trip_id: Some("T1".to_string()),
                route_id: Some("109".to_string()),
                ..Default::default()
            },
            stop_time_update: vec![
                StopTimeUpdate {
                    stop_id: Some("S1".to_string()),
                    stop_sequence: Some(3),
                    arrival: Some(StopTimeEvent {
                        delay: Some(120),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                StopTimeUpdate {
                    stop_id: Some("S9".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let names: HashMap<&str, &str> = [("S1", "Dubrava")].into();

        let lines = describe_trip_update(&tu, &names, ZAGREB);

        assert_eq!(lines[0], "Trip T1 | route 109");
        assert_eq!(
            lines[1],
            "    Dubrava (S1) | seq 3 | arrival - | departure - | delay 120s"
        );
        assert!(lines[2].starts_with("    S9 (S9) | seq -"));
    }

    #[test]
    fn test_describe_vehicle_with_model() {
        let roster = crate::fleet::parse_roster("432/ZG-8801-GR/Citaro");
        let veh = VehiclePosition {
            vehicle: Some(VehicleDescriptor {
                id: Some("432".to_string()),
                ..Default::default()
            }),
            position: Some(Position {
                latitude: 45.8,
                longitude: 15.97,
                ..Default::default()
            }),
            current_stop_sequence: Some(7),
            ..Default::default()
        };

        let lines = describe_vehicle(&veh, &roster, ZAGREB);

        assert_eq!(lines[0], "Vehicle 432 | model Citaro");
        assert!(lines[1].starts_with("Position 45.80000,15.97000 | speed - | stop -"));
        assert_eq!(lines[2], "Current stop seq 7");
    }

    #[test]
    fn test_describe_departures() {
        let deps = vec![Departure {
            route_id: None,
            trip_id: "T1".to_string(),
            departure_hhmm: "24:05".to_string(),
            delta_seconds: 86700,
        }];
        assert_eq!(describe_departures(&deps), [" route - trip T1 dep 24:05 delta 86700s"]);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&SnapshotStats::default()).unwrap();
    }
}
