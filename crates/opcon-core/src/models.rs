//! Core data models for the operator console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalize a vehicle identifier for use as a map key.
///
/// Surrounding whitespace is stripped so the same logical vehicle is never
/// tracked under two key variants. Case is preserved: ids differing by case
/// are treated as distinct vehicles. Returns `None` if nothing remains.
pub fn normalize_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// One telemetry report received from a vehicle.
///
/// Immutable once received; superseded by the next record for the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub drone_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
    /// Altitude in meters; vehicles without a baro/GPS fix omit it.
    #[serde(default)]
    pub alt: Option<f64>,
    /// Battery percentage, 0-100.
    #[serde(default)]
    pub battery: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryRecord {
    /// Normalize the record at the ingestion boundary.
    ///
    /// Trims the identifier and clamps the battery reading into 0-100.
    /// Returns `None` for records whose identifier is empty after trimming;
    /// those must never enter the last-seen table.
    pub fn normalized(mut self) -> Option<Self> {
        self.drone_id = normalize_id(&self.drone_id)?;
        if let Some(battery) = self.battery {
            self.battery = Some(battery.clamp(0.0, 100.0));
        }
        Some(self)
    }

    /// Battery percentage with missing readings defaulted to zero.
    pub fn battery_pct(&self) -> f64 {
        self.battery.unwrap_or(0.0)
    }
}

/// Operational state of a known vehicle, derived on every reconciliation
/// pass from (last seen, acceptance, now). Never cached across passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleState {
    /// Accepted and reporting within the active timeout.
    Active,
    /// Accepted but silent past the active timeout (or never reported).
    Inactive,
    /// Reporting but not accepted by the operator.
    Detected,
    /// Unaccepted and silent past the detect timeout; never surfaced.
    Gone,
}

impl std::fmt::Display for VehicleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VehicleState::Active => "active",
            VehicleState::Inactive => "inactive",
            VehicleState::Detected => "detected",
            VehicleState::Gone => "gone",
        };
        f.write_str(name)
    }
}

/// Role a vehicle plays inside one mission assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionRole {
    Independent,
    Leader,
    Follower,
}

/// A single mission waypoint with its 0-based sequence index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub seq: u32,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
}

/// Per-vehicle slice of a generated mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleMission {
    pub mission_id: String,
    pub role: MissionRole,
    pub waypoints: Vec<Waypoint>,
}

/// Mapping from vehicle id to its mission slice. Built once per generate
/// call and immutable after that; the next cycle replaces it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionAssignment {
    /// Shared by every vehicle in this assignment so partial upload
    /// failures can be correlated back to a single planning event.
    pub mission_id: String,
    pub vehicles: BTreeMap<String, VehicleMission>,
}
