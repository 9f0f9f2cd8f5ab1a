//! Simulated drone kinematics.

use chrono::Utc;
use std::f64::consts::PI;

use opcon_core::geo::METERS_PER_DEG_LAT;
use opcon_core::models::{MissionRole, TelemetryRecord, VehicleMission};

/// Meters a waypoint counts as reached from.
const ARRIVAL_RADIUS_M: f64 = 3.0;

/// One simulated drone. Loiters in a slow drifting pattern until a
/// mission arrives, then flies it waypoint-to-waypoint at fixed speed.
/// Follower-role drones keep loitering; their motion is downstream of
/// the leader and out of scope here.
pub struct SimDrone {
    pub drone_id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub battery: f64,
    pub speed_mps: f64,
    heading_deg: f64,
    mission: Option<VehicleMission>,
    next_waypoint: usize,
    elapsed_s: f64,
    /// Per-drone phase so a fleet spawned together does not move in
    /// lockstep.
    phase: f64,
}

impl SimDrone {
    pub fn new(drone_id: impl Into<String>, index: usize, center_lat: f64, center_lon: f64) -> Self {
        // Spread the fleet on a ring around the center, ~40m apart.
        let angle = index as f64 * (2.0 * PI / 8.0);
        let offset_deg = 40.0 * index as f64 / METERS_PER_DEG_LAT;
        Self {
            drone_id: drone_id.into(),
            lat: center_lat + offset_deg * angle.cos(),
            lon: center_lon + offset_deg * angle.sin(),
            altitude_m: 30.0,
            battery: 100.0,
            speed_mps: 8.0,
            heading_deg: (index as f64 * 45.0) % 360.0,
            mission: None,
            next_waypoint: 0,
            elapsed_s: 0.0,
            phase: index as f64 * 0.7,
        }
    }

    pub fn mission_id(&self) -> Option<&str> {
        self.mission.as_ref().map(|m| m.mission_id.as_str())
    }

    /// Take on a new mission (or drop the current one). Restarts from the
    /// first waypoint when the mission id changes.
    pub fn set_mission(&mut self, mission: Option<VehicleMission>) {
        let changed = match (&self.mission, &mission) {
            (Some(old), Some(new)) => old.mission_id != new.mission_id,
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.next_waypoint = 0;
            self.mission = mission;
        }
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.elapsed_s += dt;
        self.battery = (self.battery - 0.02 * dt).max(0.0);

        let flying = match self.mission.as_ref() {
            Some(m) => m.role != MissionRole::Follower && self.next_waypoint < m.waypoints.len(),
            None => false,
        };
        if flying {
            self.fly_mission(dt);
        } else {
            self.loiter(dt);
        }
    }

    /// Build the telemetry report for the current state.
    pub fn report(&self) -> TelemetryRecord {
        TelemetryRecord {
            drone_id: self.drone_id.clone(),
            lat: self.lat,
            lon: self.lon,
            roll: 0.0,
            pitch: 0.0,
            yaw: self.heading_deg,
            alt: Some(self.altitude_m),
            battery: Some(self.battery),
            timestamp: Utc::now(),
        }
    }

    fn fly_mission(&mut self, dt: f64) {
        let Some(mission) = self.mission.as_ref() else {
            return;
        };
        let Some(target) = mission.waypoints.get(self.next_waypoint) else {
            return;
        };

        self.altitude_m = target.altitude_m;

        let meters_per_deg_lon = METERS_PER_DEG_LAT * self.lat.to_radians().cos();
        let dy = (target.lat - self.lat) * METERS_PER_DEG_LAT;
        let dx = (target.lon - self.lon) * meters_per_deg_lon;
        let dist = (dx * dx + dy * dy).sqrt();

        if dist <= ARRIVAL_RADIUS_M {
            self.next_waypoint += 1;
            return;
        }

        self.heading_deg = dx.atan2(dy).to_degrees().rem_euclid(360.0);
        let step = (self.speed_mps * dt).min(dist);
        self.lat += (dy / dist) * step / METERS_PER_DEG_LAT;
        self.lon += (dx / dist) * step / meters_per_deg_lon;
    }

    fn loiter(&mut self, dt: f64) {
        // Slow deterministic heading drift; each drone wanders its own way.
        self.heading_deg =
            (self.heading_deg + 15.0 * (0.3 * self.elapsed_s + self.phase).sin() * dt)
                .rem_euclid(360.0);
        let heading_rad = self.heading_deg.to_radians();
        let step = 2.0 * dt;
        let meters_per_deg_lon = METERS_PER_DEG_LAT * self.lat.to_radians().cos();
        self.lat += step * heading_rad.cos() / METERS_PER_DEG_LAT;
        self.lon += step * heading_rad.sin() / meters_per_deg_lon;
    }
}
