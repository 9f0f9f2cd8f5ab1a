//! In-memory state store.
//!
//! The fleet tracker and mission session are single-owner objects per the
//! console's execution model; all access to them is serialized behind
//! mutexes. The telemetry and mission tables are hot read paths and live
//! in DashMaps. Persistence writes happen after the lock is released.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tokio::sync::broadcast;

use opcon_core::models::{MissionRole, TelemetryRecord, VehicleMission, VehicleState};
use opcon_core::session::{GenerateParams, MissionSession, SessionState};
use opcon_core::{AcceptancePolicy, FleetStateTracker, SessionError};

use crate::config::Config;
use crate::persistence::{kv, missions, Database};

/// Rendering-facing summary of one vehicle. `gone` vehicles never appear.
#[derive(Debug, Clone, Serialize)]
pub struct DroneSummary {
    pub drone_id: String,
    pub state: VehicleState,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    pub battery: Option<f64>,
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
    pub yaw: Option<f64>,
    pub last_seen: Option<DateTime<Utc>>,
    pub selected: bool,
    pub mission_id: Option<String>,
    pub role: Option<MissionRole>,
}

/// One reconciliation pass's output, broadcast to console clients.
#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub generated_at: DateTime<Utc>,
    pub drones: Vec<DroneSummary>,
}

/// Echoed to a vehicle in its telemetry response: its current tasking.
#[derive(Debug, Clone, Serialize)]
pub struct TaskingReply {
    pub role: Option<MissionRole>,
    pub mission: Option<VehicleMission>,
}

/// Result of one generate invocation, shaped for the operator client.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedMission {
    pub mission_id: String,
    /// The planner fell back to the raw polygon vertices; the operator
    /// should inspect before uploading.
    pub degenerate: bool,
    pub path: Vec<[f64; 2]>,
    pub vehicles: std::collections::BTreeMap<String, VehicleMission>,
}

pub struct AppState {
    telemetry: DashMap<String, TelemetryRecord>,
    tracker: Mutex<FleetStateTracker>,
    session: Mutex<MissionSession>,
    missions: DashMap<String, VehicleMission>,
    /// Fleet snapshots from the reconciliation loop, fanned out to
    /// WebSocket clients.
    pub tx: broadcast::Sender<FleetSnapshot>,
    db: Database,
    config: Config,
}

impl AppState {
    pub fn with_database(db: Database, config: Config) -> Self {
        let (tx, _) = broadcast::channel(16);
        let policy = AcceptancePolicy {
            auto_accept_first: config.auto_accept_first,
        };
        Self {
            telemetry: DashMap::new(),
            tracker: Mutex::new(FleetStateTracker::new(policy)),
            session: Mutex::new(MissionSession::new()),
            missions: DashMap::new(),
            tx,
            db,
            config,
        }
    }

    // Lock poisoning only happens if a holder panicked; at that point the
    // process is coming down anyway.
    fn tracker_lock(&self) -> std::sync::MutexGuard<'_, FleetStateTracker> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn session_lock(&self) -> std::sync::MutexGuard<'_, MissionSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Restore persisted state: acceptance set, finalized polygon, and
    /// uploaded missions.
    pub async fn load_from_database(&self) -> anyhow::Result<()> {
        let accepted = kv::load_accepted(self.db.pool()).await?;
        if !accepted.is_empty() {
            tracing::info!("Restored {} accepted vehicle(s)", accepted.len());
            let policy = AcceptancePolicy {
                auto_accept_first: self.config.auto_accept_first,
            };
            let mut tracker = self.tracker_lock();
            *tracker = FleetStateTracker::with_accepted(policy, accepted);
        }

        if let Some(polygon) = kv::load_polygon(self.db.pool()).await? {
            let mut session = self.session_lock();
            match session.resume_planned(polygon) {
                Ok(()) => tracing::info!("Restored finalized survey polygon"),
                Err(e) => tracing::warn!("Discarding persisted polygon: {}", e),
            }
        }

        for (drone_id, mission) in missions::load_all_missions(self.db.pool()).await? {
            self.missions.insert(drone_id, mission);
        }
        if !self.missions.is_empty() {
            tracing::info!("Restored {} uploaded mission(s)", self.missions.len());
        }
        Ok(())
    }

    // ===== Telemetry =====

    /// Ingest one normalized telemetry record and return the vehicle's
    /// current tasking.
    pub async fn ingest_telemetry(&self, record: TelemetryRecord) -> TaskingReply {
        let acceptance_changed = {
            let mut tracker = self.tracker_lock();
            tracker.observe(&record)
        };
        let drone_id = record.drone_id.clone();
        self.telemetry.insert(drone_id.clone(), record);

        if acceptance_changed {
            self.persist_accepted().await;
        }

        let mission = self.missions.get(&drone_id).map(|m| m.clone());
        TaskingReply {
            role: mission.as_ref().map(|m| m.role),
            mission,
        }
    }

    // ===== Fleet =====

    /// Classify the whole fleet against `now`. Gone vehicles are omitted;
    /// the last-seen table is fully up to date before this runs because
    /// every report is absorbed at ingest time.
    pub fn fleet_snapshot(&self, now: DateTime<Utc>) -> FleetSnapshot {
        let (states, selected, last_seen) = {
            let tracker = self.tracker_lock();
            let states = tracker.classify_all(now);
            let selected = tracker.selected().map(str::to_string);
            let last_seen: Vec<(String, Option<DateTime<Utc>>)> = states
                .keys()
                .map(|id| (id.clone(), tracker.last_seen(id)))
                .collect();
            (states, selected, last_seen)
        };
        let last_seen: std::collections::HashMap<_, _> = last_seen.into_iter().collect();

        let drones = states
            .into_iter()
            .filter(|(_, state)| *state != VehicleState::Gone)
            .map(|(id, state)| {
                let telemetry = self.telemetry.get(&id);
                let mission = self.missions.get(&id);
                DroneSummary {
                    selected: selected.as_deref() == Some(id.as_str()),
                    state,
                    lat: telemetry.as_ref().map(|t| t.lat),
                    lon: telemetry.as_ref().map(|t| t.lon),
                    alt: telemetry.as_ref().and_then(|t| t.alt),
                    battery: telemetry.as_ref().and_then(|t| t.battery),
                    roll: telemetry.as_ref().map(|t| t.roll),
                    pitch: telemetry.as_ref().map(|t| t.pitch),
                    yaw: telemetry.as_ref().map(|t| t.yaw),
                    last_seen: last_seen.get(&id).copied().flatten(),
                    mission_id: mission.as_ref().map(|m| m.mission_id.clone()),
                    role: mission.as_ref().map(|m| m.role),
                    drone_id: id,
                }
            })
            .collect();

        FleetSnapshot {
            generated_at: now,
            drones,
        }
    }

    /// Evict vehicles classified gone from the tracker and the telemetry
    /// table. Returns the evicted ids.
    pub fn evict_gone(&self, now: DateTime<Utc>) -> Vec<String> {
        let gone = {
            let mut tracker = self.tracker_lock();
            tracker.evict_gone(now)
        };
        for id in &gone {
            self.telemetry.remove(id);
        }
        gone
    }

    pub fn roster(&self) -> Vec<String> {
        let tracker = self.tracker_lock();
        tracker.known_ids().into_iter().collect()
    }

    /// Accept a vehicle for tracking. `None` for unknown ids.
    pub async fn accept(&self, id: &str) -> Option<bool> {
        let changed = {
            let mut tracker = self.tracker_lock();
            if !tracker.is_known(id) {
                return None;
            }
            tracker.accept(id)
        };
        if changed {
            self.persist_accepted().await;
        }
        Some(changed)
    }

    /// Release a vehicle. Clears its uploaded mission and, if it was the
    /// operator's selection, the selection. `None` for unknown ids.
    pub async fn release(&self, id: &str) -> Option<bool> {
        let changed = {
            let mut tracker = self.tracker_lock();
            if !tracker.is_known(id) {
                return None;
            }
            tracker.release(id)
        };
        if changed {
            self.persist_accepted().await;
        }
        if self.missions.remove(id).is_some() {
            if let Err(e) = missions::delete_mission(self.db.pool(), id).await {
                tracing::error!("Failed to delete mission for {}: {}", id, e);
            }
        }
        Some(changed)
    }

    pub fn select(&self, id: &str) -> bool {
        let mut tracker = self.tracker_lock();
        if !tracker.is_known(id) {
            return false;
        }
        tracker.select(id);
        true
    }

    async fn persist_accepted(&self) {
        let accepted: BTreeSet<String> = {
            let tracker = self.tracker_lock();
            tracker.accepted_ids().into_iter().collect()
        };
        if let Err(e) = kv::save_accepted(self.db.pool(), &accepted).await {
            tracing::error!("Failed to persist acceptance set: {}", e);
        }
    }

    // ===== Mission session =====

    pub fn session_state(&self) -> SessionState {
        self.session_lock().state()
    }

    pub fn session_polygon(&self) -> Vec<[f64; 2]> {
        self.session_lock().polygon().to_vec()
    }

    pub fn start_drawing(&self) -> Result<(), SessionError> {
        self.session_lock().start_drawing()
    }

    pub fn add_vertex(&self, lat: f64, lon: f64) -> Result<usize, SessionError> {
        self.session_lock().add_vertex(lat, lon)
    }

    pub fn move_vertex(&self, index: usize, lat: f64, lon: f64) -> Result<(), SessionError> {
        self.session_lock().move_vertex(index, lat, lon)
    }

    pub fn remove_vertex(&self, index: usize) -> Result<(), SessionError> {
        self.session_lock().remove_vertex(index)
    }

    /// Finalize the drawn polygon and persist the durable copy.
    pub async fn finish_polygon(&self) -> Result<Vec<[f64; 2]>, SessionError> {
        let polygon = {
            let mut session = self.session_lock();
            session.finish()?.to_vec()
        };
        if let Err(e) = kv::save_polygon(self.db.pool(), &polygon).await {
            tracing::error!("Failed to persist survey polygon: {}", e);
        }
        Ok(polygon)
    }

    /// Plan coverage and build the per-vehicle assignment from the
    /// accepted vehicle pool.
    pub fn generate(&self, params: GenerateParams) -> Result<GeneratedMission, SessionError> {
        let pool = {
            let tracker = self.tracker_lock();
            tracker.accepted_ids()
        };
        let mut session = self.session_lock();
        let (path, assignment) = session.generate(params, &pool)?;
        Ok(GeneratedMission {
            mission_id: assignment.mission_id.clone(),
            degenerate: path.degenerate,
            path: path.points.clone(),
            vehicles: assignment.vehicles.clone(),
        })
    }

    /// Store the generated assignment as each vehicle's current mission
    /// and mark every assigned vehicle accepted. Returns the number of
    /// vehicles tasked, or `None` when nothing has been generated.
    pub async fn upload_missions(&self) -> Option<usize> {
        let assignment = {
            let session = self.session_lock();
            session.assignment().cloned()
        }?;

        let mut acceptance_changed = false;
        {
            let mut tracker = self.tracker_lock();
            for id in assignment.vehicles.keys() {
                acceptance_changed |= tracker.accept(id);
            }
        }
        if acceptance_changed {
            self.persist_accepted().await;
        }

        let count = assignment.vehicles.len();
        for (drone_id, mission) in assignment.vehicles {
            if let Err(e) = missions::upsert_mission(self.db.pool(), &drone_id, &mission).await {
                tracing::error!("Failed to persist mission for {}: {}", drone_id, e);
            }
            self.missions.insert(drone_id, mission);
        }
        Some(count)
    }

    /// Remove missions for the given vehicles; an empty list means all.
    pub async fn stop_missions(&self, drone_ids: &[String]) -> usize {
        let targets: Vec<String> = if drone_ids.is_empty() {
            self.missions.iter().map(|e| e.key().clone()).collect()
        } else {
            drone_ids.to_vec()
        };

        let mut stopped = 0;
        for id in &targets {
            if self.missions.remove(id).is_some() {
                stopped += 1;
            }
        }
        if drone_ids.is_empty() {
            if let Err(e) = missions::clear_missions(self.db.pool()).await {
                tracing::error!("Failed to clear missions: {}", e);
            }
        } else {
            for id in &targets {
                if let Err(e) = missions::delete_mission(self.db.pool(), id).await {
                    tracing::error!("Failed to delete mission for {}: {}", id, e);
                }
            }
        }
        stopped
    }

    /// Discard the session and its durable polygon copy.
    pub async fn clear_session(&self) {
        self.session_lock().clear();
        if let Err(e) = kv::delete_polygon(self.db.pool()).await {
            tracing::error!("Failed to delete persisted polygon: {}", e);
        }
    }

    pub fn vehicle_mission(&self, drone_id: &str) -> Option<VehicleMission> {
        self.missions.get(drone_id).map(|m| m.clone())
    }

    pub fn broadcast_snapshot(&self, snapshot: FleetSnapshot) {
        // No receivers is fine; the loop keeps running without clients.
        let _ = self.tx.send(snapshot);
    }
}
