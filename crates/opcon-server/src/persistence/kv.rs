//! Fixed-key JSON documents.

use anyhow::Result;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;

pub const KEY_ACCEPTED_IDS: &str = "accepted_ids";
pub const KEY_MISSION_POLYGON: &str = "mission_polygon";

async fn put_json<T: Serialize>(pool: &SqlitePool, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    sqlx::query(
        r#"
        INSERT INTO kv_state (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3
        "#,
    )
    .bind(key)
    .bind(json)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

async fn get_json<T: DeserializeOwned>(pool: &SqlitePool, key: &str) -> Result<Option<T>> {
    let row = sqlx::query("SELECT value FROM kv_state WHERE key = ?1")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let json: String = row.get(0);
            Ok(Some(serde_json::from_str(&json)?))
        }
        None => Ok(None),
    }
}

async fn delete_key(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM kv_state WHERE key = ?1")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist the acceptance set. Called on every accept/release.
pub async fn save_accepted(pool: &SqlitePool, accepted: &BTreeSet<String>) -> Result<()> {
    put_json(pool, KEY_ACCEPTED_IDS, accepted).await
}

pub async fn load_accepted(pool: &SqlitePool) -> Result<BTreeSet<String>> {
    Ok(get_json(pool, KEY_ACCEPTED_IDS).await?.unwrap_or_default())
}

/// Persist the finalized survey polygon.
pub async fn save_polygon(pool: &SqlitePool, polygon: &[[f64; 2]]) -> Result<()> {
    put_json(pool, KEY_MISSION_POLYGON, &polygon).await
}

pub async fn load_polygon(pool: &SqlitePool) -> Result<Option<Vec<[f64; 2]>>> {
    get_json(pool, KEY_MISSION_POLYGON).await
}

pub async fn delete_polygon(pool: &SqlitePool) -> Result<()> {
    delete_key(pool, KEY_MISSION_POLYGON).await
}
