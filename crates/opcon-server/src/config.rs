//! Server configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Shared token vehicles present in `X-Drone-Token`.
    pub drone_token: String,
    /// Bearer token for operator endpoints.
    pub operator_token: String,
    /// Reconciliation pass period in seconds.
    pub reconcile_period_secs: u64,
    /// Altitude stamped on generated waypoints when the operator gives none.
    pub default_altitude_m: f64,
    /// Auto-accept the first detected vehicle (policy, off by default).
    pub auto_accept_first: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("OPCON_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            database_path: env::var("OPCON_DB")
                .unwrap_or_else(|_| "data/opcon.db".to_string()),
            database_max_connections: env::var("OPCON_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            drone_token: env::var("OPCON_DRONE_TOKEN")
                .unwrap_or_else(|_| "dev-drone-token".to_string()),
            operator_token: env::var("OPCON_OPERATOR_TOKEN")
                .unwrap_or_else(|_| "dev-operator-token".to_string()),
            reconcile_period_secs: env::var("OPCON_TICK_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            default_altitude_m: env::var("OPCON_MISSION_ALT_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30.0),
            auto_accept_first: env::var("OPCON_AUTO_ACCEPT")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}
