//! Per-vehicle mission persistence.

use anyhow::Result;
use chrono::Utc;
use opcon_core::models::{MissionRole, VehicleMission, Waypoint};
use sqlx::{Row, SqlitePool};

pub async fn upsert_mission(
    pool: &SqlitePool,
    drone_id: &str,
    mission: &VehicleMission,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO missions (drone_id, mission_id, role, waypoints, uploaded_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(drone_id) DO UPDATE SET
            mission_id = ?2, role = ?3, waypoints = ?4, uploaded_at = ?5
        "#,
    )
    .bind(drone_id)
    .bind(&mission.mission_id)
    .bind(role_str(mission.role))
    .bind(serde_json::to_string(&mission.waypoints)?)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_mission(pool: &SqlitePool, drone_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM missions WHERE drone_id = ?1")
        .bind(drone_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn clear_missions(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM missions").execute(pool).await?;
    Ok(())
}

pub async fn load_all_missions(pool: &SqlitePool) -> Result<Vec<(String, VehicleMission)>> {
    let rows = sqlx::query("SELECT drone_id, mission_id, role, waypoints FROM missions")
        .fetch_all(pool)
        .await?;

    let mut missions = Vec::with_capacity(rows.len());
    for row in rows {
        let drone_id: String = row.get(0);
        let mission_id: String = row.get(1);
        let role: String = row.get(2);
        let waypoints_json: String = row.get(3);
        let waypoints: Vec<Waypoint> = serde_json::from_str(&waypoints_json)?;
        missions.push((
            drone_id,
            VehicleMission {
                mission_id,
                role: parse_role(&role),
                waypoints,
            },
        ));
    }
    Ok(missions)
}

fn role_str(role: MissionRole) -> &'static str {
    match role {
        MissionRole::Independent => "independent",
        MissionRole::Leader => "leader",
        MissionRole::Follower => "follower",
    }
}

fn parse_role(s: &str) -> MissionRole {
    match s {
        "leader" => MissionRole::Leader,
        "follower" => MissionRole::Follower,
        _ => MissionRole::Independent,
    }
}
