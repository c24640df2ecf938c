//! Matches realtime feed entities against static schedule identities.

use std::collections::HashMap;

use crate::gtfs_rt::{FeedEntity, FeedMessage, TripDescriptor, TripUpdate, VehiclePosition};

/// The single criterion a correlation runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    ByRoute(String),
    ByVehicle(String),
    ByStop(String),
}

impl Filter {
    /// Picks one filter out of the supplied criteria.
    ///
    /// Priority is route, then vehicle, then stop; later criteria are ignored
    /// once an earlier one is present. Blank values count as not supplied.
    pub fn select(route_id: Option<&str>, vehicle_id: Option<&str>, stop_id: Option<&str>) -> Option<Self> {
        let given = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);

        given(route_id)
            .map(Filter::ByRoute)
            .or_else(|| given(vehicle_id).map(Filter::ByVehicle))
            .or_else(|| given(stop_id).map(Filter::ByStop))
    }
}

/// One feed entity that satisfied the filter, borrowed from the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatch<'a> {
    pub entity_id: &'a str,
    pub trip_id: Option<&'a str>,
    pub trip_update: Option<&'a TripUpdate>,
    pub vehicle: Option<&'a VehiclePosition>,
}

/// Trip reference of an entity: the trip update's if it carries one,
/// otherwise the vehicle position's.
pub fn trip_descriptor(entity: &FeedEntity) -> Option<&TripDescriptor> {
    let from_update = entity
        .trip_update
        .as_ref()
        .map(|tu| &tu.trip)
        .filter(|trip| **trip != TripDescriptor::default());

    from_update.or_else(|| entity.vehicle.as_ref().and_then(|v| v.trip.as_ref()))
}

/// Returns the entities of `feed` matching `filter`, in feed order.
///
/// `trip_to_route` resolves trip ids for [`Filter::ByRoute`]; the other
/// filters only look at the realtime data.
pub fn correlate<'a>(
    feed: &'a FeedMessage,
    trip_to_route: &HashMap<String, String>,
    filter: &Filter,
) -> Vec<CorrelationMatch<'a>> {
    let vehicle_target = match filter {
        Filter::ByVehicle(id) => Some(id.to_lowercase()),
        _ => None,
    };

    feed.entity
        .iter()
        .filter_map(|entity| {
            let trip_id = trip_descriptor(entity).and_then(|t| t.trip_id.as_deref());

            let matched = match filter {
                Filter::ByRoute(route_id) => {
                    trip_id.and_then(|id| trip_to_route.get(id)) == Some(route_id)
                }
                Filter::ByVehicle(_) => entity
                    .vehicle
                    .as_ref()
                    .and_then(|v| v.vehicle.as_ref())
                    .and_then(|d| d.id.as_deref())
                    .filter(|id| !id.is_empty())
                    .is_some_and(|id| Some(id.to_lowercase()) == vehicle_target),
                Filter::ByStop(stop_id) => entity.trip_update.as_ref().is_some_and(|tu| {
                    tu.stop_time_update
                        .iter()
                        .any(|stu| stu.stop_id.as_deref() == Some(stop_id.as_str()))
                }),
            };

            matched.then(|| CorrelationMatch {
                entity_id: &entity.id,
                trip_id,
                trip_update: entity.trip_update.as_ref(),
                vehicle: entity.vehicle.as_ref(),
            })
        })
        .collect()
}
