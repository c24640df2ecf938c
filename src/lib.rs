pub mod calendar;
pub mod config;
pub mod correlate;
pub mod departures;
pub mod error;
pub mod fetch;
pub mod fleet;
pub mod output;
pub mod parser;
pub mod schedule;
pub mod static_data;
pub mod stats;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
