//! Station snapshot models
//!
//! These types mirror what the external station store exposes: a station with its
//! ordered playlists, local mounts and remote relays, plus the streamer accounts
//! and media records used by the runtime callbacks.

use chrono::{DateTime, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_FRONTEND_TYPE: &str = "icecast";
pub const DEFAULT_BACKEND_TYPE: &str = "liquidsoap";
pub const DEFAULT_CHARSET: &str = "UTF-8";
pub const DEFAULT_DJ_BUFFER: u32 = 5;
pub const DEFAULT_CROSSFADE: f64 = 2.0;
pub const DEFAULT_BITRATE: u32 = 128;
pub const DEFAULT_PLAYLIST_NAME: &str = "default";
pub const DEFAULT_PLAYLIST_WEIGHT: u32 = 3;

/// Reduce a display name to `[a-z0-9_]`, collapsing runs of other characters.
///
/// The result can be embedded both as a bare identifier and inside a quoted
/// string literal of the generated engine program.
pub fn sanitize_short_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    out
}

/// Map an ISO weekday number (1 = Monday .. 7 = Sunday) to a `Weekday`.
pub fn weekday_from_iso(day: u32) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

// ========================================
// Station
// ========================================

/// Free-form backend settings with typed accessors for the keys the compiler reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub charset: Option<String>,
    pub dj_port: Option<u16>,
    pub telnet_port: Option<u16>,
    pub dj_buffer: Option<u32>,
    pub crossfade: Option<f64>,
    pub custom_config: Option<String>,

    /// Keys this backend does not interpret, preserved as stored
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BackendSettings {
    pub fn charset(&self) -> &str {
        self.charset
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CHARSET)
    }

    pub fn dj_buffer(&self) -> u32 {
        self.dj_buffer.unwrap_or(DEFAULT_DJ_BUFFER)
    }

    pub fn crossfade(&self) -> f64 {
        self.crossfade.unwrap_or(DEFAULT_CROSSFADE)
    }

    /// Explicit DJ port; zero counts as unset
    pub fn dj_port(&self) -> Option<u16> {
        self.dj_port.filter(|p| *p != 0)
    }

    pub fn telnet_port(&self) -> Option<u16> {
        self.telnet_port.filter(|p| *p != 0)
    }

    pub fn custom_config(&self) -> Option<&str> {
        self.custom_config.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Frontend settings the backend needs: listener port and broadcast source password
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendSettings {
    pub port: Option<u16>,
    pub source_pw: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: i64,
    pub name: String,
    pub short_name: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub url: Option<String>,

    pub frontend_type: String,
    pub frontend_config: FrontendSettings,
    pub backend_type: String,
    pub backend_config: BackendSettings,

    /// Key the engine presents when calling back over HTTP
    pub adapter_api_key: Option<String>,

    pub enable_streamers: bool,
    pub is_streamer_live: bool,
    pub current_streamer_id: Option<i64>,
    /// Seconds a kicked streamer stays deactivated; zero disables
    pub disconnect_deactivate_streamer: u32,
    pub manual_autodj: bool,

    /// Overrides `<stations_root>/<short_name>` when set
    pub radio_base_dir: Option<PathBuf>,

    pub playlists: Vec<Playlist>,
    pub mounts: Vec<Mount>,
    pub remotes: Vec<Remote>,
}

impl Station {
    /// Short name reduced to `[a-z0-9_]`, falling back to the full name.
    ///
    /// Empty when neither yields a usable identifier.
    pub fn safe_short_name(&self) -> String {
        let short = sanitize_short_name(&self.short_name);
        if short.is_empty() {
            sanitize_short_name(&self.name)
        } else {
            short
        }
    }

    /// A station with default adapters and no playlists, mounts or remotes
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            short_name: sanitize_short_name(name),
            description: None,
            genre: None,
            url: None,
            frontend_type: DEFAULT_FRONTEND_TYPE.to_string(),
            frontend_config: FrontendSettings::default(),
            backend_type: DEFAULT_BACKEND_TYPE.to_string(),
            backend_config: BackendSettings::default(),
            adapter_api_key: None,
            enable_streamers: true,
            is_streamer_live: false,
            current_streamer_id: None,
            disconnect_deactivate_streamer: 0,
            manual_autodj: false,
            radio_base_dir: None,
            playlists: Vec::new(),
            mounts: Vec::new(),
            remotes: Vec::new(),
        }
    }

    /// Enabled playlists in declaration order
    pub fn enabled_playlists(&self) -> impl Iterator<Item = &Playlist> {
        self.playlists.iter().filter(|p| p.is_enabled)
    }

    pub fn has_default_playlist(&self) -> bool {
        self.enabled_playlists()
            .any(|p| p.playlist_type == PlaylistType::Default)
    }
}

// ========================================
// Playlists
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistSource {
    #[default]
    Songs,
    RemoteUrl,
}

/// How a remote URL playlist is consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemotePlaylistType {
    /// A playlist file (m3u/pls) fetched by the engine
    Playlist,
    /// A continuous stream
    #[default]
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistType {
    #[default]
    Default,
    OncePerXSongs,
    OncePerXMinutes,
    Scheduled,
    OncePerDay,
    /// Declared in the program but only reachable from custom configuration
    Advanced,
}

impl PlaylistType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistType::Default => "default",
            PlaylistType::OncePerXSongs => "once_per_x_songs",
            PlaylistType::OncePerXMinutes => "once_per_x_minutes",
            PlaylistType::Scheduled => "scheduled",
            PlaylistType::OncePerDay => "once_per_day",
            PlaylistType::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistOrder {
    Sequential,
    #[default]
    Shuffle,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub station_id: i64,
    pub name: String,
    pub source: PlaylistSource,
    pub remote_url: Option<String>,
    pub remote_type: RemotePlaylistType,
    pub playlist_type: PlaylistType,
    pub order: PlaylistOrder,
    pub is_enabled: bool,
    pub weight: u32,

    pub play_per_songs: u32,
    pub play_per_minutes: u32,

    /// HHMM station-local times
    pub schedule_start_time: u32,
    pub schedule_end_time: u32,
    pub schedule_days: Vec<Weekday>,

    pub play_once_time: u32,
    pub play_once_days: Vec<Weekday>,
}

impl Playlist {
    /// An enabled, empty, standard-weighted song playlist
    pub fn new(station_id: i64, name: &str) -> Self {
        Self {
            id: 0,
            station_id,
            name: name.to_string(),
            source: PlaylistSource::Songs,
            remote_url: None,
            remote_type: RemotePlaylistType::default(),
            playlist_type: PlaylistType::Default,
            order: PlaylistOrder::default(),
            is_enabled: true,
            weight: DEFAULT_PLAYLIST_WEIGHT,
            play_per_songs: 0,
            play_per_minutes: 0,
            schedule_start_time: 0,
            schedule_end_time: 0,
            schedule_days: Vec::new(),
            play_once_time: 0,
            play_once_days: Vec::new(),
        }
    }

    pub fn short_name(&self) -> String {
        let short = sanitize_short_name(&self.name);
        if short.is_empty() {
            format!("playlist_{}", self.id)
        } else {
            short
        }
    }
}

// ========================================
// Outputs
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Aac,
    Ogg,
    Opus,
    #[default]
    Mp3,
}

impl std::str::FromStr for AudioFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aac" => Ok(AudioFormat::Aac),
            "ogg" => Ok(AudioFormat::Ogg),
            "opus" => Ok(AudioFormat::Opus),
            "mp3" => Ok(AudioFormat::Mp3),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown audio format: {}",
                other
            ))),
        }
    }
}

/// AutoDJ broadcast target shared by local mounts and remote relays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoDjOutput {
    pub enabled: bool,
    pub format: AudioFormat,
    pub bitrate: Option<u32>,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: String,
    pub mount: Option<String>,
    pub is_public: bool,
    /// Speak the legacy ICY source protocol instead of HTTP PUT
    pub shoutcast_mode: bool,
}

impl AutoDjOutput {
    pub fn bitrate(&self) -> u32 {
        self.bitrate.filter(|b| *b > 0).unwrap_or(DEFAULT_BITRATE)
    }
}

impl Default for AutoDjOutput {
    fn default() -> Self {
        Self {
            enabled: true,
            format: AudioFormat::Mp3,
            bitrate: None,
            host: "127.0.0.1".to_string(),
            port: 8000,
            username: None,
            password: String::new(),
            mount: None,
            is_public: false,
            shoutcast_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    pub id: i64,
    pub name: String,
    pub autodj: AutoDjOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remote {
    pub id: i64,
    /// Relay type identifier, resolved through the adapter registry
    pub remote_type: String,
    pub autodj: AutoDjOutput,
}

// ========================================
// Streamers and media
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streamer {
    pub id: i64,
    pub station_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub reactivate_at: Option<DateTime<Utc>>,
}

impl Streamer {
    /// Whether the account may log in at `now`
    pub fn can_stream(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.reactivate_at.map_or(true, |at| at <= now)
    }

    pub fn deactivate_for(&mut self, seconds: u32, now: DateTime<Utc>) {
        self.reactivate_at = Some(now + Duration::seconds(i64::from(seconds)));
    }
}

/// Library track with the cue/fade hints the engine honours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationMedia {
    pub id: i64,
    pub song_id: String,
    /// Path relative to the station media directory
    pub path: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub cue_in: Option<f64>,
    pub cue_out: Option<f64>,
    pub fade_in: Option<f64>,
    pub fade_out: Option<f64>,
    /// Gain in dB
    pub amplify: Option<f64>,
}

/// Decision returned by the scheduler for the next track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NextSong {
    Media(StationMedia),
    CustomUri { uri: String, duration: Option<f64> },
    /// A ready-made engine reference
    Raw(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_short_name_resanitizes_stored_value() {
        let mut station = Station::new(1, "My Radio");
        station.short_name = "My Radio".to_string();
        assert_eq!(station.safe_short_name(), "my_radio");

        station.short_name = "../../etc".to_string();
        assert_eq!(station.safe_short_name(), "etc");

        station.short_name = "..".to_string();
        assert_eq!(station.safe_short_name(), "my_radio");
    }

    #[test]
    fn test_sanitize_short_name_strips_punctuation() {
        assert_eq!(sanitize_short_name("My \"Cool\" Radio!\n"), "my_cool_radio");
        assert_eq!(sanitize_short_name("  --  "), "");
        assert_eq!(sanitize_short_name("KEXP 90.3"), "kexp_90_3");
    }

    #[test]
    fn test_backend_settings_defaults() {
        let settings = BackendSettings::default();
        assert_eq!(settings.charset(), "UTF-8");
        assert_eq!(settings.dj_buffer(), 5);
        assert_eq!(settings.crossfade(), 2.0);
        assert_eq!(settings.dj_port(), None);
        assert_eq!(settings.custom_config(), None);
    }

    #[test]
    fn test_backend_settings_keep_unknown_keys() {
        let json = r#"{"charset":"ISO-8859-1","dj_port":0,"record_streams":true}"#;
        let settings: BackendSettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.charset(), "ISO-8859-1");
        assert_eq!(settings.dj_port(), None);
        assert_eq!(settings.extra.get("record_streams"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_has_default_playlist_ignores_disabled() {
        let mut station = Station::new(1, "Test");
        let mut playlist = Playlist::new(1, "main");
        playlist.is_enabled = false;
        station.playlists.push(playlist);

        assert!(!station.has_default_playlist());

        station.playlists[0].is_enabled = true;
        assert!(station.has_default_playlist());
    }

    #[test]
    fn test_streamer_deactivation_window() {
        let now = Utc::now();
        let mut streamer = Streamer {
            id: 1,
            station_id: 1,
            username: "dj".to_string(),
            display_name: None,
            is_active: true,
            reactivate_at: None,
        };
        assert!(streamer.can_stream(now));

        streamer.deactivate_for(60, now);
        assert!(!streamer.can_stream(now));
        assert!(streamer.can_stream(now + Duration::seconds(61)));
    }

    #[test]
    fn test_weekday_from_iso() {
        assert_eq!(weekday_from_iso(1), Some(Weekday::Mon));
        assert_eq!(weekday_from_iso(7), Some(Weekday::Sun));
        assert_eq!(weekday_from_iso(0), None);
    }
}
