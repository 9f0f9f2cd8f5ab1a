//! HTTP client for the operator console server.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use opcon_core::models::{MissionRole, TelemetryRecord, VehicleMission};

/// Tasking echoed back in the telemetry response: the vehicle's current
/// role and mission, if the operator has uploaded one.
#[derive(Debug, Clone, Deserialize)]
pub struct Tasking {
    #[serde(default)]
    pub role: Option<MissionRole>,
    #[serde(default)]
    pub mission: Option<VehicleMission>,
}

/// HTTP client for sending telemetry to the console server.
pub struct ConsoleClient {
    client: Client,
    base_url: String,
    drone_token: String,
}

impl ConsoleClient {
    /// Create a new console client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the console server (e.g., "http://localhost:3000")
    /// * `drone_token` - Shared vehicle token (OPCON_DRONE_TOKEN)
    pub fn new(base_url: impl Into<String>, drone_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            drone_token: drone_token.into(),
        }
    }

    /// Send one telemetry report and return the tasking the server echoes.
    pub async fn send_telemetry(&self, record: &TelemetryRecord) -> Result<Tasking> {
        let url = format!("{}/v1/telemetry", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-Drone-Token", &self.drone_token)
            .json(record)
            .send()
            .await
            .context("Failed to send telemetry")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telemetry rejected ({}): {}", status, body);
        }

        response
            .json::<Tasking>()
            .await
            .context("Failed to parse tasking reply")
    }
}
