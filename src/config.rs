//! Runtime configuration read from the environment (and `.env`).

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono_tz::Tz;

pub const DEFAULT_FEED_URL: &str = "https://www.zet.hr/gtfs-rt-protobuf";
pub const DEFAULT_FLEET_FILE: &str = "voznipark.txt";
pub const DEFAULT_TIMEZONE: &str = "Europe/Zagreb";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the GTFS static `.txt` files.
    pub gtfs_dir: PathBuf,
    pub feed_url: String,
    pub fleet_file: PathBuf,
    /// Local timezone of the feed, used for query dates and realtime times.
    pub timezone: Tz,
}

impl Config {
    /// Reads `GTFS_DIR`, `GTFS_RT_URL`, `FLEET_FILE` and `TRANSIT_TZ`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tz_name = var("TRANSIT_TZ").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = tz_name
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid TRANSIT_TZ '{tz_name}': {e}"))?;

        Ok(Self {
            gtfs_dir: var("GTFS_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            feed_url: var("GTFS_RT_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            fleet_file: var("FLEET_FILE").map_or_else(|| PathBuf::from(DEFAULT_FLEET_FILE), PathBuf::from),
            timezone,
        })
    }
}
