//! Fleet roster: operator garage numbers, registrations and vehicle models.
//!
//! The roster is a plain text file with one `garage/registration/model` entry
//! per line. Blank lines and lines starting with `#` are ignored.

use serde::Serialize;
use std::path::Path;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetVehicle {
    pub garage_number: Option<String>,
    pub registration: Option<String>,
    /// Model text, or the whole line when it has no `/` structure.
    pub model: String,
    pub raw: String,
}

fn parse_line(line: &str) -> FleetVehicle {
    let parts: Vec<&str> = line.split('/').collect();
    if parts.len() >= 3 {
        FleetVehicle {
            garage_number: Some(parts[0].trim().to_string()),
            registration: Some(parts[1].trim().to_string()),
            model: parts[2..].join("/").trim().to_string(),
            raw: line.to_string(),
        }
    } else {
        FleetVehicle {
            garage_number: None,
            registration: None,
            model: line.to_string(),
            raw: line.to_string(),
        }
    }
}

pub fn parse_roster(text: &str) -> Vec<FleetVehicle> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse_line)
        .collect()
}

/// Reads the roster at `path`. A missing file is an empty roster.
pub fn load_roster(path: &Path) -> std::io::Result<Vec<FleetVehicle>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_roster(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Fleet roster not present");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Entries whose garage number equals `query`, or whose registration or raw
/// line contains it, ignoring case.
pub fn find_vehicles<'a>(roster: &'a [FleetVehicle], query: &str) -> Vec<&'a FleetVehicle> {
    let q = query.trim().to_lowercase();
    roster
        .iter()
        .filter(|v| {
            v.garage_number.as_deref() == Some(query.trim())
                || v.registration.as_deref().is_some_and(|r| r.to_lowercase().contains(&q))
                || v.raw.to_lowercase().contains(&q)
        })
        .collect()
}

/// Model of the vehicle whose garage number is `vehicle_id`.
pub fn model_for<'a>(roster: &'a [FleetVehicle], vehicle_id: &str) -> Option<&'a str> {
    roster
        .iter()
        .find(|v| v.garage_number.as_deref() == Some(vehicle_id))
        .map(|v| v.model.as_str())
        .filter(|m| !m.is_empty())
}
