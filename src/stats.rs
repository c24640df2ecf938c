use serde::Serialize;

use crate::correlate::CorrelationMatch;
use crate::gtfs_rt::FeedMessage;

/// Entity counts of a realtime snapshot, logged after every fetch.
#[derive(Debug, Default, Serialize)]
pub struct SnapshotStats {
    pub timestamp: Option<u64>,
    pub total_entities: usize,
    pub trip_updates: usize,
    pub vehicles: usize,
    pub with_trip: usize,
    pub with_vehicle_descriptor: usize,
    pub with_position: usize,
}

impl SnapshotStats {
    pub fn from_feed(feed: &FeedMessage) -> Self {
        let mut s = SnapshotStats {
            timestamp: feed.header.timestamp,
            total_entities: feed.entity.len(),
            ..Default::default()
        };

        for e in &feed.entity {
            if e.trip_update.is_some() {
                s.trip_updates += 1;
            }

            if let Some(v) = &e.vehicle {
                s.vehicles += 1;

                if v.trip.is_some() {
                    s.with_trip += 1;
                }

                if v.vehicle.is_some() {
                    s.with_vehicle_descriptor += 1;
                }

                if v.position.is_some() {
                    s.with_position += 1;
                }
            }
        }

        s
    }
}

/// GPS coverage of a correlation result.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub matches: usize,
    /// Matches whose vehicle reports a position.
    pub gps_equipped: usize,
    /// Matches with a trip update but no reported position.
    pub scheduled_without_gps: usize,
}

impl MatchSummary {
    pub fn from_matches(matches: &[CorrelationMatch<'_>]) -> Self {
        let mut s = MatchSummary {
            matches: matches.len(),
            ..Default::default()
        };

        for m in matches {
            if m.vehicle.is_some_and(|v| v.position.is_some()) {
                s.gps_equipped += 1;
            } else if m.trip_update.is_some() {
                s.scheduled_without_gps += 1;
            }
        }

        s
    }
}
