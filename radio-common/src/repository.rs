//! Contracts with the external station store and scheduler
//!
//! The backend never owns station state. It reads snapshots through
//! [`StationRepository`] and asks [`NextSongProvider`] for scheduling decisions;
//! every mutation it needs goes back through these traits.

use crate::models::{NextSong, Playlist, Station, Streamer};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StationRepository: Send + Sync {
    /// Load a station with its ordered playlists, mounts and remotes
    async fn station(&self, station_id: i64) -> Result<Station>;

    /// Media paths (relative to the station media directory) of a song playlist, in play order
    async fn playlist_media(&self, playlist_id: i64) -> Result<Vec<String>>;

    /// Persist an empty standard playlist under `name` and return it with its id.
    ///
    /// Concurrent callers may both create one; the store decides whether that is
    /// a duplicate or a uniqueness violation.
    async fn create_default_playlist(&self, station_id: i64, name: &str) -> Result<Playlist>;

    /// Check streamer credentials; `None` when they do not match an active account
    async fn authenticate_streamer(
        &self,
        station_id: i64,
        username: &str,
        password: &str,
    ) -> Result<Option<Streamer>>;

    async fn streamer(&self, streamer_id: i64) -> Result<Streamer>;

    async fn set_current_streamer(&self, station_id: i64, streamer_id: Option<i64>) -> Result<()>;

    /// Block the streamer from logging in again for `seconds`
    async fn deactivate_streamer(&self, streamer_id: i64, seconds: u32) -> Result<()>;

    async fn set_streamer_live(&self, station_id: i64, is_live: bool) -> Result<()>;
}

#[async_trait]
pub trait NextSongProvider: Send + Sync {
    /// Decide what plays next; `None` when nothing is available
    async fn next_song(&self, station: &Station, as_autodj: bool) -> Result<Option<NextSong>>;
}
