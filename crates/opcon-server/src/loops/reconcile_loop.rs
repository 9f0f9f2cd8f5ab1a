//! Fleet reconciliation loop.
//!
//! Runs in the background, periodically re-classifying every known
//! vehicle against the wall clock, evicting vehicles that have been
//! silent past the detection window, and broadcasting the resulting
//! snapshot to console clients.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use chrono::Utc;

use opcon_core::models::VehicleState;

use crate::config::Config;
use crate::state::AppState;

/// Start the fleet reconciliation loop.
pub async fn run_reconcile_loop(state: Arc<AppState>, config: Config) {
    let mut ticker = interval(Duration::from_secs(config.reconcile_period_secs));
    let mut previous: HashMap<String, VehicleState> = HashMap::new();

    loop {
        ticker.tick().await;

        let now = Utc::now();
        let evicted = state.evict_gone(now);
        for id in &evicted {
            tracing::info!("Vehicle {} gone, removed from fleet", id);
            previous.remove(id);
        }

        let snapshot = state.fleet_snapshot(now);
        for drone in &snapshot.drones {
            match previous.get(&drone.drone_id) {
                Some(prev) if *prev == drone.state => {}
                Some(prev) => tracing::info!(
                    "Vehicle {} {} -> {}",
                    drone.drone_id,
                    prev,
                    drone.state
                ),
                None => tracing::info!("Vehicle {} entered fleet as {}", drone.drone_id, drone.state),
            }
            previous.insert(drone.drone_id.clone(), drone.state);
        }

        state.broadcast_snapshot(snapshot);
    }
}
