//! Liquidsoap backend
//!
//! Compiles a station snapshot into a Liquidsoap program, writes it into the
//! station's config directory, and drives the running engine over its telnet
//! control socket.

pub mod compiler;
pub mod control;
pub mod document;
pub mod format;
pub mod schedule;
pub mod sections;

pub use compiler::{compile, CompileContext, PlaylistExport, StationSnapshot};
pub use control::ControlClient;

use crate::adapters::RemoteKind;
use crate::error::{Error, Result};
use radio_common::config::{CallbackConfig, TomlConfig};
use radio_common::models::{PlaylistSource, Station, DEFAULT_PLAYLIST_NAME};
use radio_common::{StationFilesystem, StationRepository};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the generated program inside the station config directory
pub const CONFIG_FILE_NAME: &str = "liquidsoap.liq";

/// Lowest frontend port handed out to station 1
const BASE_FRONTEND_PORT: i64 = 8000;
const PORTS_PER_STATION: i64 = 10;

// ========================================
// Ports
// ========================================

/// Listener port of the station's frontend
pub fn frontend_port(station: &Station) -> u16 {
    if let Some(port) = station.frontend_config.port.filter(|p| *p != 0) {
        return port;
    }

    let derived = BASE_FRONTEND_PORT + (station.id - 1) * PORTS_PER_STATION;
    u16::try_from(derived).unwrap_or(BASE_FRONTEND_PORT as u16)
}

/// Port the live DJ harbor listens on
pub fn stream_port(station: &Station) -> u16 {
    station
        .backend_config
        .dj_port()
        .unwrap_or_else(|| frontend_port(station).saturating_add(5))
}

/// Port of the engine's telnet control socket
pub fn telnet_port(station: &Station) -> u16 {
    station
        .backend_config
        .telnet_port()
        .unwrap_or_else(|| stream_port(station).saturating_sub(1))
}

/// Name for a synthesized default playlist that no existing playlist already sanitizes to
fn default_playlist_name(station: &Station) -> String {
    let taken: HashSet<String> = station.playlists.iter().map(|p| p.short_name()).collect();

    let mut name = DEFAULT_PLAYLIST_NAME.to_string();
    let mut suffix = 1;
    while taken.contains(&name) {
        suffix += 1;
        name = format!("{}_{}", DEFAULT_PLAYLIST_NAME, suffix);
    }
    name
}

// ========================================
// Backend
// ========================================

#[derive(Debug, Clone)]
pub struct Liquidsoap {
    filesystem: StationFilesystem,
    binaries: Vec<PathBuf>,
    inside_docker: bool,
    callback: CallbackConfig,
    control: ControlClient,
}

impl Liquidsoap {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            filesystem: StationFilesystem::new(&config.stations_root),
            binaries: config.liquidsoap_binaries.clone(),
            inside_docker: config.inside_docker,
            callback: config.callback.clone(),
            control: ControlClient::new(
                config.telnet_host.clone(),
                Duration::from_secs(config.connect_timeout_secs),
                Duration::from_secs(config.command_timeout_secs),
            ),
        }
    }

    pub fn filesystem(&self) -> &StationFilesystem {
        &self.filesystem
    }

    pub fn control(&self) -> &ControlClient {
        &self.control
    }

    /// First configured engine binary that exists on this host
    pub fn binary(&self) -> Option<&Path> {
        self.binaries.iter().map(PathBuf::as_path).find(|p| p.exists())
    }

    pub fn config_path(&self, station: &Station) -> PathBuf {
        self.filesystem.config_dir(station).join(CONFIG_FILE_NAME)
    }

    /// Command a supervisor runs to start the station's engine
    pub fn command_line(&self, station: &Station) -> String {
        match self.binary() {
            Some(binary) => format!("{} {}", binary.display(), self.config_path(station).display()),
            None => "/bin/false".to_string(),
        }
    }

    pub fn compile_context(&self) -> CompileContext {
        CompileContext {
            inside_docker: self.inside_docker,
            callback: self.callback.clone(),
            utc_offset_secs: compiler::host_utc_offset(),
        }
    }

    /// Gather everything the compile needs from the store.
    ///
    /// Creates and persists a default playlist when the station has no enabled
    /// one; the returned snapshot always contains it.
    pub async fn prepare(
        &self,
        repo: &dyn StationRepository,
        station: &Station,
        remote_kinds: Vec<RemoteKind>,
    ) -> Result<StationSnapshot> {
        let mut station = station.clone();

        if !station.has_default_playlist() {
            let name = default_playlist_name(&station);
            info!(station_id = station.id, %name, "Station has no default playlist, creating one");
            let playlist = repo
                .create_default_playlist(station.id, &name)
                .await
                .map_err(|e| Error::Compile(format!("Cannot create default playlist: {}", e)))?;
            station.playlists.push(playlist);
        }

        let mut exports = Vec::new();
        for playlist in station.enabled_playlists() {
            if playlist.source != PlaylistSource::Songs {
                continue;
            }

            let media = repo.playlist_media(playlist.id).await.map_err(|e| {
                Error::Compile(format!("Cannot read playlist '{}': {}", playlist.name, e))
            })?;
            let entries: Vec<String> = media
                .iter()
                .map(|path| self.filesystem.full_media_path(&station, path).display().to_string())
                .collect();

            debug!(
                station_id = station.id,
                playlist = %playlist.name,
                entries = entries.len(),
                "Exporting playlist"
            );
            exports.push(PlaylistExport {
                file_name: format!("{}.m3u", schedule::playlist_var(playlist)),
                entries,
            });
        }

        Ok(StationSnapshot {
            config_dir: self.filesystem.config_dir(&station),
            playlists_dir: self.filesystem.playlists_dir(&station),
            station,
            remote_kinds,
            exports,
        })
    }

    /// Compile and write the station's program; nothing is written if compiling fails
    pub async fn write_configuration(
        &self,
        repo: &dyn StationRepository,
        station: &Station,
        remote_kinds: Vec<RemoteKind>,
    ) -> Result<PathBuf> {
        let snapshot = self.prepare(repo, station, remote_kinds).await?;
        let program = compile(&snapshot, &self.compile_context())?;

        tokio::fs::create_dir_all(&snapshot.config_dir).await?;
        write_playlist_exports(&snapshot).await?;

        let path = snapshot.config_dir.join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, program).await?;
        info!(station_id = station.id, path = %path.display(), "Wrote engine configuration");

        Ok(path)
    }

    // ========================================
    // Control commands
    // ========================================

    pub async fn command(&self, station: &Station, command: &str) -> Result<Vec<String>> {
        self.control.send(telnet_port(station), command).await
    }

    /// Skip the track currently playing on the first local output
    pub async fn skip(&self, station: &Station) -> Result<Vec<String>> {
        let command = format!("{}.skip", format::var_name(station, "local_1"));
        self.command(station, &command).await
    }

    /// Push a track onto the manual request queue, refusing while one is pending
    pub async fn enqueue_request(&self, station: &Station, uri: &str) -> Result<Vec<String>> {
        let queue = format::var_name(station, "requests");
        let push = format!("{}.push {}", queue, uri);
        control::command_line(&push)?;

        let pending = self.command(station, &format!("{}.queue", queue)).await?;
        if pending.first().is_some_and(|line| !line.is_empty()) {
            return Err(Error::RequestQueueBusy);
        }

        self.command(station, &push).await
    }

    /// Kick the live source, first suspending its account when the station asks for it
    pub async fn disconnect_streamer(
        &self,
        repo: &dyn StationRepository,
        station: &Station,
    ) -> Result<Vec<String>> {
        let window = station.disconnect_deactivate_streamer;

        if let Some(streamer_id) = station.current_streamer_id {
            if window > 0 {
                info!(station_id = station.id, streamer_id, seconds = window, "Deactivating streamer");
                repo.deactivate_streamer(streamer_id, window).await?;
            }
        }

        let command = format!("{}.stop", format::var_name(station, "input_streamer"));
        self.command(station, &command).await
    }
}

/// Replace the playlists directory contents with this compile's exports
async fn write_playlist_exports(snapshot: &StationSnapshot) -> Result<()> {
    let dir = &snapshot.playlists_dir;
    tokio::fs::create_dir_all(dir).await?;

    let mut existing = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = existing.next_entry().await? {
        if entry.file_type().await?.is_file() {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), "Cannot remove stale playlist: {}", e);
            }
        }
    }

    for export in &snapshot.exports {
        tokio::fs::write(dir.join(&export.file_name), export.contents()).await?;
    }

    Ok(())
}
