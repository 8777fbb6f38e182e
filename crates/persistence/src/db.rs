//! SQLite save slots. Each row holds one bincode-encoded [`SaveData`].

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Executor;
use tracing::{debug, info};

use crate::SaveData;

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/main.db"
}

/// Listing entry for one stored save.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveSlot {
    pub id: i64,
    pub name: String,
    pub turn: u32,
    pub saved_at: String,
}

/// Open (creating if missing) the database at `url` and apply the schema.
pub async fn init_db(url: &str) -> anyhow::Result<SqlitePool> {
    ensure_parent_dir(url)?;
    let opts = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("parse database url {url}"))?
        .create_if_missing(true);
    // a single connection keeps `sqlite::memory:` databases shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .with_context(|| format!("open {url}"))?;
    pool.execute(include_str!("../sql/schema.sql")).await?;
    info!(url, "save database ready");
    Ok(pool)
}

/// Create the directory holding a file-backed database.
fn ensure_parent_dir(url: &str) -> anyhow::Result<()> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|p| p.split('?').next().unwrap_or(p));
    let Some(path) = path.filter(|p| !p.starts_with(":memory:")) else {
        return Ok(());
    };
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Store `save` under `name`; returns the new row id.
pub async fn create_save(pool: &SqlitePool, name: &str, save: &SaveData) -> anyhow::Result<i64> {
    let payload = save.to_bytes()?;
    let id = sqlx::query(
        "INSERT INTO saves (name, version, turn, saved_at, payload) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(i64::from(save.version))
    .bind(i64::from(save.state.turn))
    .bind(save.saved_at.to_rfc3339())
    .bind(payload)
    .execute(pool)
    .await?
    .last_insert_rowid();
    debug!(id, name, turn = save.state.turn, "save written");
    Ok(id)
}

/// Most recent save stored under `name`.
pub async fn load_latest(pool: &SqlitePool, name: &str) -> anyhow::Result<Option<SaveData>> {
    let payload: Option<Vec<u8>> =
        sqlx::query_scalar("SELECT payload FROM saves WHERE name = ? ORDER BY id DESC LIMIT 1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    match payload {
        Some(bytes) => Ok(Some(
            SaveData::from_bytes(&bytes).with_context(|| format!("decode save {name}"))?,
        )),
        None => Ok(None),
    }
}

/// All stored saves, oldest first.
pub async fn list_saves(pool: &SqlitePool) -> anyhow::Result<Vec<SaveSlot>> {
    let rows: Vec<(i64, String, i64, String)> =
        sqlx::query_as("SELECT id, name, turn, saved_at FROM saves ORDER BY id")
            .fetch_all(pool)
            .await?;
    rows.into_iter()
        .map(|(id, name, turn, saved_at)| {
            Ok(SaveSlot {
                id,
                name,
                turn: u32::try_from(turn).context("turn out of range")?,
                saved_at,
            })
        })
        .collect()
}
