//! SQLite implementation of the station store contracts

use crate::models::{
    sanitize_short_name, weekday_from_iso, AudioFormat, AutoDjOutput, BackendSettings,
    FrontendSettings, Mount, NextSong, Playlist, PlaylistOrder, PlaylistSource, PlaylistType,
    RemotePlaylistType, Remote, Station, StationMedia, Streamer, DEFAULT_PLAYLIST_WEIGHT,
};
use crate::repository::{NextSongProvider, StationRepository};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use tracing::{debug, info};

/// Hex SHA-256 digest used for stored streamer passwords
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_playlists(&self, station_id: i64) -> Result<Vec<Playlist>> {
        let rows = sqlx::query(
            "SELECT * FROM station_playlists WHERE station_id = ? ORDER BY position, id",
        )
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(playlist_from_row).collect()
    }

    async fn load_mounts(&self, station_id: i64) -> Result<Vec<Mount>> {
        let rows = sqlx::query(
            "SELECT * FROM station_mounts WHERE station_id = ? ORDER BY position, id",
        )
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Mount {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    autodj: autodj_from_row(row)?,
                })
            })
            .collect()
    }

    async fn load_remotes(&self, station_id: i64) -> Result<Vec<Remote>> {
        let rows = sqlx::query(
            "SELECT * FROM station_remotes WHERE station_id = ? ORDER BY position, id",
        )
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Remote {
                    id: row.try_get("id")?,
                    remote_type: row.try_get("remote_type")?,
                    autodj: autodj_from_row(row)?,
                })
            })
            .collect()
    }

    async fn media(&self, media_id: i64) -> Result<StationMedia> {
        let row = sqlx::query("SELECT * FROM station_media WHERE id = ?")
            .bind(media_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Media {}", media_id)))?;

        Ok(StationMedia {
            id: row.try_get("id")?,
            song_id: row.try_get("song_id")?,
            path: row.try_get("path")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
            length: row.try_get("length")?,
            cue_in: row.try_get("cue_in")?,
            cue_out: row.try_get("cue_out")?,
            fade_in: row.try_get("fade_in")?,
            fade_out: row.try_get("fade_out")?,
            amplify: row.try_get("amplify")?,
        })
    }
}

#[async_trait]
impl StationRepository for SqliteStore {
    async fn station(&self, station_id: i64) -> Result<Station> {
        let row = sqlx::query("SELECT * FROM stations WHERE id = ?")
            .bind(station_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Station {}", station_id)))?;

        let frontend_config: String = row.try_get("frontend_config")?;
        let backend_config: String = row.try_get("backend_config")?;
        let radio_base_dir: Option<String> = row.try_get("radio_base_dir")?;
        let short_name: String = row.try_get("short_name")?;

        Ok(Station {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            short_name: sanitize_short_name(&short_name),
            description: row.try_get("description")?,
            genre: row.try_get("genre")?,
            url: row.try_get("url")?,
            frontend_type: row.try_get("frontend_type")?,
            frontend_config: serde_json::from_str::<FrontendSettings>(&frontend_config)?,
            backend_type: row.try_get("backend_type")?,
            backend_config: serde_json::from_str::<BackendSettings>(&backend_config)?,
            adapter_api_key: row.try_get("adapter_api_key")?,
            enable_streamers: row.try_get("enable_streamers")?,
            is_streamer_live: row.try_get("is_streamer_live")?,
            current_streamer_id: row.try_get("current_streamer_id")?,
            disconnect_deactivate_streamer: to_u32(row.try_get("disconnect_deactivate_streamer")?),
            manual_autodj: row.try_get("manual_autodj")?,
            radio_base_dir: radio_base_dir.filter(|d| !d.is_empty()).map(PathBuf::from),
            playlists: self.load_playlists(station_id).await?,
            mounts: self.load_mounts(station_id).await?,
            remotes: self.load_remotes(station_id).await?,
        })
    }

    async fn playlist_media(&self, playlist_id: i64) -> Result<Vec<String>> {
        let paths: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT m.path FROM station_playlist_media spm
            JOIN station_media m ON m.id = spm.media_id
            WHERE spm.playlist_id = ?
            ORDER BY spm.weight, spm.id
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(paths.into_iter().map(|(path,)| path).collect())
    }

    async fn create_default_playlist(&self, station_id: i64, name: &str) -> Result<Playlist> {
        let result = sqlx::query(
            "INSERT INTO station_playlists (station_id, name, playlist_type, weight) VALUES (?, ?, 'default', ?)",
        )
        .bind(station_id)
        .bind(name)
        .bind(i64::from(DEFAULT_PLAYLIST_WEIGHT))
        .execute(&self.pool)
        .await?;

        let mut playlist = Playlist::new(station_id, name);
        playlist.id = result.last_insert_rowid();

        info!(station_id, playlist_id = playlist.id, "Created default playlist");
        Ok(playlist)
    }

    async fn authenticate_streamer(
        &self,
        station_id: i64,
        username: &str,
        password: &str,
    ) -> Result<Option<Streamer>> {
        let row = sqlx::query(
            "SELECT * FROM station_streamers WHERE station_id = ? AND streamer_username = ?",
        )
        .bind(station_id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!(station_id, username, "Unknown streamer");
            return Ok(None);
        };

        let stored: String = row.try_get("streamer_password")?;
        if stored != hash_password(password) {
            return Ok(None);
        }

        let streamer = streamer_from_row(&row)?;
        if !streamer.can_stream(Utc::now()) {
            debug!(station_id, username, "Streamer is deactivated");
            return Ok(None);
        }

        Ok(Some(streamer))
    }

    async fn streamer(&self, streamer_id: i64) -> Result<Streamer> {
        let row = sqlx::query("SELECT * FROM station_streamers WHERE id = ?")
            .bind(streamer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Streamer {}", streamer_id)))?;

        streamer_from_row(&row)
    }

    async fn set_current_streamer(&self, station_id: i64, streamer_id: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE stations SET current_streamer_id = ? WHERE id = ?")
            .bind(streamer_id)
            .bind(station_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn deactivate_streamer(&self, streamer_id: i64, seconds: u32) -> Result<()> {
        let mut streamer = self.streamer(streamer_id).await?;
        streamer.deactivate_for(seconds, Utc::now());

        sqlx::query("UPDATE station_streamers SET reactivate_at = ? WHERE id = ?")
            .bind(streamer.reactivate_at)
            .bind(streamer_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_streamer_live(&self, station_id: i64, is_live: bool) -> Result<()> {
        sqlx::query("UPDATE stations SET is_streamer_live = ? WHERE id = ?")
            .bind(is_live)
            .bind(station_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl NextSongProvider for SqliteStore {
    /// Pop the oldest queue entry the scheduler left for this station
    async fn next_song(&self, station: &Station, as_autodj: bool) -> Result<Option<NextSong>> {
        let row = sqlx::query(
            r#"
            SELECT id, media_id, autodj_custom_uri, duration FROM station_queue
            WHERE station_id = ? AND sent_to_autodj = 0
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(station.id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let queue_id: i64 = row.try_get("id")?;
        let media_id: Option<i64> = row.try_get("media_id")?;
        let custom_uri: Option<String> = row.try_get("autodj_custom_uri")?;
        let duration: Option<f64> = row.try_get("duration")?;

        if as_autodj {
            sqlx::query("UPDATE station_queue SET sent_to_autodj = 1 WHERE id = ?")
                .bind(queue_id)
                .execute(&self.pool)
                .await?;
        }

        if let Some(media_id) = media_id {
            return Ok(Some(NextSong::Media(self.media(media_id).await?)));
        }

        Ok(custom_uri
            .filter(|uri| !uri.is_empty())
            .map(|uri| NextSong::CustomUri { uri, duration }))
    }
}

// ========================================
// Row mapping
// ========================================

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn to_u16(value: i64) -> u16 {
    u16::try_from(value.max(0)).unwrap_or(u16::MAX)
}

fn parse_days(raw: &str) -> Vec<Weekday> {
    raw.split(',')
        .filter_map(|d| d.trim().parse::<u32>().ok())
        .filter_map(weekday_from_iso)
        .collect()
}

fn parse_enum<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| Error::InvalidInput(format!("Invalid {}: {}", column, raw)))
}

fn playlist_from_row(row: &SqliteRow) -> Result<Playlist> {
    let source: String = row.try_get("source")?;
    let remote_type: String = row.try_get("remote_type")?;
    let playlist_type: String = row.try_get("playlist_type")?;
    let order: String = row.try_get("playlist_order")?;
    let schedule_days: String = row.try_get("schedule_days")?;
    let play_once_days: String = row.try_get("play_once_days")?;

    Ok(Playlist {
        id: row.try_get("id")?,
        station_id: row.try_get("station_id")?,
        name: row.try_get("name")?,
        source: parse_enum::<PlaylistSource>("source", &source)?,
        remote_url: row.try_get("remote_url")?,
        remote_type: parse_enum::<RemotePlaylistType>("remote_type", &remote_type)?,
        playlist_type: parse_enum::<PlaylistType>("playlist_type", &playlist_type)?,
        order: parse_enum::<PlaylistOrder>("playlist_order", &order)?,
        is_enabled: row.try_get("is_enabled")?,
        weight: to_u32(row.try_get("weight")?),
        play_per_songs: to_u32(row.try_get("play_per_songs")?),
        play_per_minutes: to_u32(row.try_get("play_per_minutes")?),
        schedule_start_time: to_u32(row.try_get("schedule_start_time")?),
        schedule_end_time: to_u32(row.try_get("schedule_end_time")?),
        schedule_days: parse_days(&schedule_days),
        play_once_time: to_u32(row.try_get("play_once_time")?),
        play_once_days: parse_days(&play_once_days),
    })
}

fn autodj_from_row(row: &SqliteRow) -> Result<AutoDjOutput> {
    let format: String = row.try_get("autodj_format")?;
    let bitrate: Option<i64> = row.try_get("autodj_bitrate")?;

    Ok(AutoDjOutput {
        enabled: row.try_get("enable_autodj")?,
        format: format.parse::<AudioFormat>()?,
        bitrate: bitrate.map(to_u32),
        host: row.try_get("autodj_host")?,
        port: to_u16(row.try_get("autodj_port")?),
        username: row.try_get("autodj_username")?,
        password: row.try_get("autodj_password")?,
        mount: row.try_get("autodj_mount")?,
        is_public: row.try_get("is_public")?,
        shoutcast_mode: row.try_get("shoutcast_mode")?,
    })
}

fn streamer_from_row(row: &SqliteRow) -> Result<Streamer> {
    let reactivate_at: Option<DateTime<Utc>> = row.try_get("reactivate_at")?;

    Ok(Streamer {
        id: row.try_get("id")?,
        station_id: row.try_get("station_id")?,
        username: row.try_get("streamer_username")?,
        display_name: row.try_get("display_name")?,
        is_active: row.try_get("is_active")?,
        reactivate_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_hex_sha256() {
        assert_eq!(hash_password("hackme").len(), 64);
        assert_ne!(hash_password("hackme"), hash_password("hackme2"));
        assert_eq!(
            hash_password(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_parse_days_skips_invalid_entries() {
        assert_eq!(parse_days("1, 3,x,9,7"), vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
        assert!(parse_days("").is_empty());
    }

    #[test]
    fn test_parse_enum_rejects_unknown_value() {
        assert_eq!(
            parse_enum::<PlaylistType>("playlist_type", "once_per_x_songs").unwrap(),
            PlaylistType::OncePerXSongs
        );
        assert!(parse_enum::<PlaylistType>("playlist_type", "bogus").is_err());
    }
}
