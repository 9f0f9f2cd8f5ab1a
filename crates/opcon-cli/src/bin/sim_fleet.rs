//! CLI tool to simulate a drone fleet against the console server.
//!
//! Streams telemetry for N drones and flies whatever missions the
//! operator uploads.

use clap::Parser;
use std::time::Duration;
use tokio::time;

use opcon_cli::sim::{ConsoleClient, SimDrone};

/// Simulate a drone fleet reporting to the operator console
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Console server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Shared vehicle token (OPCON_DRONE_TOKEN on the server)
    #[arg(long, default_value = "dev-drone-token")]
    token: String,

    /// Number of simulated drones
    #[arg(long, default_value_t = 2)]
    count: usize,

    /// Fleet center latitude (default: Warsaw)
    #[arg(long, default_value_t = 52.2297)]
    lat: f64,

    /// Fleet center longitude (default: Warsaw)
    #[arg(long, default_value_t = 21.0122)]
    lon: f64,

    /// Telemetry period in milliseconds
    #[arg(long, default_value_t = 1000)]
    period_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Connecting to console server at {}...", args.url);
    let client = ConsoleClient::new(&args.url, &args.token);

    let mut fleet: Vec<SimDrone> = (0..args.count)
        .map(|i| SimDrone::new(format!("SIM{:03}", i + 1), i, args.lat, args.lon))
        .collect();

    println!("Simulating {} drone(s) around ({}, {})", args.count, args.lat, args.lon);
    println!("  Telemetry period: {}ms", args.period_ms);
    println!();

    let dt = args.period_ms as f64 / 1000.0;
    let mut ticker = time::interval(Duration::from_millis(args.period_ms));
    loop {
        ticker.tick().await;

        for drone in &mut fleet {
            drone.tick(dt);
            match client.send_telemetry(&drone.report()).await {
                Ok(tasking) => {
                    let incoming = tasking.mission.as_ref().map(|m| m.mission_id.clone());
                    if incoming.as_deref() != drone.mission_id() {
                        match &tasking.mission {
                            Some(m) => println!(
                                "{}: new mission {} ({} waypoint(s), role {:?})",
                                drone.drone_id,
                                m.mission_id,
                                m.waypoints.len(),
                                m.role
                            ),
                            None => println!("{}: mission cleared", drone.drone_id),
                        }
                    }
                    drone.set_mission(tasking.mission);
                }
                Err(e) => eprintln!("{}: {}", drone.drone_id, e),
            }
        }
    }
}
