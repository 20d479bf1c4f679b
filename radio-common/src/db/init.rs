//! Database initialization
//!
//! Creates the station store schema on first run. Every statement is
//! `CREATE TABLE IF NOT EXISTS`, so opening an existing database is a no-op.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the station database at `db_path`
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the engine callbacks read while a compile writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema, used by tests and dry runs.
///
/// Limited to one connection: every SQLite in-memory connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all station tables
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_stations_table(pool).await?;
    create_playlists_table(pool).await?;
    create_media_tables(pool).await?;
    create_mounts_table(pool).await?;
    create_remotes_table(pool).await?;
    create_streamers_table(pool).await?;
    create_queue_table(pool).await?;

    Ok(())
}

async fn create_stations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            short_name TEXT NOT NULL,
            description TEXT,
            genre TEXT,
            url TEXT,
            frontend_type TEXT NOT NULL DEFAULT 'icecast',
            frontend_config TEXT NOT NULL DEFAULT '{}',
            backend_type TEXT NOT NULL DEFAULT 'liquidsoap',
            backend_config TEXT NOT NULL DEFAULT '{}',
            adapter_api_key TEXT,
            enable_streamers INTEGER NOT NULL DEFAULT 1,
            is_streamer_live INTEGER NOT NULL DEFAULT 0,
            current_streamer_id INTEGER,
            disconnect_deactivate_streamer INTEGER NOT NULL DEFAULT 0,
            manual_autodj INTEGER NOT NULL DEFAULT 0,
            radio_base_dir TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_playlists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_playlists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'songs',
            remote_url TEXT,
            remote_type TEXT NOT NULL DEFAULT 'stream',
            playlist_type TEXT NOT NULL DEFAULT 'default',
            playlist_order TEXT NOT NULL DEFAULT 'shuffle',
            is_enabled INTEGER NOT NULL DEFAULT 1,
            weight INTEGER NOT NULL DEFAULT 3,
            play_per_songs INTEGER NOT NULL DEFAULT 0,
            play_per_minutes INTEGER NOT NULL DEFAULT 0,
            schedule_start_time INTEGER NOT NULL DEFAULT 0,
            schedule_end_time INTEGER NOT NULL DEFAULT 0,
            schedule_days TEXT NOT NULL DEFAULT '',
            play_once_time INTEGER NOT NULL DEFAULT 0,
            play_once_days TEXT NOT NULL DEFAULT '',
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_media_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id) ON DELETE CASCADE,
            song_id TEXT NOT NULL DEFAULT '',
            path TEXT NOT NULL,
            title TEXT,
            artist TEXT,
            length REAL,
            cue_in REAL,
            cue_out REAL,
            fade_in REAL,
            fade_out REAL,
            amplify REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_playlist_media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playlist_id INTEGER NOT NULL REFERENCES station_playlists(id) ON DELETE CASCADE,
            media_id INTEGER NOT NULL REFERENCES station_media(id) ON DELETE CASCADE,
            weight INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_mounts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_mounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            enable_autodj INTEGER NOT NULL DEFAULT 1,
            autodj_format TEXT NOT NULL DEFAULT 'mp3',
            autodj_bitrate INTEGER,
            autodj_host TEXT NOT NULL DEFAULT '127.0.0.1',
            autodj_port INTEGER NOT NULL DEFAULT 8000,
            autodj_username TEXT,
            autodj_password TEXT NOT NULL DEFAULT '',
            autodj_mount TEXT,
            is_public INTEGER NOT NULL DEFAULT 0,
            shoutcast_mode INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_remotes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_remotes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id) ON DELETE CASCADE,
            remote_type TEXT NOT NULL DEFAULT 'icecast',
            enable_autodj INTEGER NOT NULL DEFAULT 1,
            autodj_format TEXT NOT NULL DEFAULT 'mp3',
            autodj_bitrate INTEGER,
            autodj_host TEXT NOT NULL DEFAULT '',
            autodj_port INTEGER NOT NULL DEFAULT 8000,
            autodj_username TEXT,
            autodj_password TEXT NOT NULL DEFAULT '',
            autodj_mount TEXT,
            is_public INTEGER NOT NULL DEFAULT 0,
            shoutcast_mode INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_streamers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_streamers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id) ON DELETE CASCADE,
            streamer_username TEXT NOT NULL,
            streamer_password TEXT NOT NULL,
            display_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            reactivate_at TEXT,
            UNIQUE (station_id, streamer_username)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Hand-off table filled by the external scheduler, drained by the next-song callback
async fn create_queue_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_id INTEGER NOT NULL REFERENCES stations(id) ON DELETE CASCADE,
            media_id INTEGER REFERENCES station_media(id) ON DELETE SET NULL,
            autodj_custom_uri TEXT,
            duration REAL,
            sent_to_autodj INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
