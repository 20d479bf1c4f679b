//! Station snapshot to program text
//!
//! `compile` is pure: the same snapshot and context always produce the same
//! program. Everything that touches the store or the filesystem happens before
//! (`Liquidsoap::prepare`) or after (`Liquidsoap::write_configuration`).

use super::document::{ConfigDocument, Section, SectionPipeline};
use super::schedule::playlist_var;
use super::sections;
use crate::adapters::RemoteKind;
use crate::error::{Error, Result};
use chrono::{Local, Offset};
use radio_common::config::CallbackConfig;
use radio_common::models::Station;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// Host-dependent inputs to a compile
#[derive(Debug, Clone, PartialEq)]
pub struct CompileContext {
    pub inside_docker: bool,
    pub callback: CallbackConfig,
    /// Host offset from UTC used to shift schedule hours
    pub utc_offset_secs: i32,
}

impl Default for CompileContext {
    fn default() -> Self {
        Self {
            inside_docker: false,
            callback: CallbackConfig::default(),
            utc_offset_secs: 0,
        }
    }
}

/// One M3U file in the station's playlists directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistExport {
    pub file_name: String,
    /// Absolute media paths in playlist order
    pub entries: Vec<String>,
}

impl PlaylistExport {
    pub fn contents(&self) -> String {
        let mut out = self.entries.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

/// Everything a compile reads, resolved up front
#[derive(Debug, Clone)]
pub struct StationSnapshot {
    /// Station with its default playlist guaranteed present
    pub station: Station,
    pub config_dir: PathBuf,
    pub playlists_dir: PathBuf,
    /// Relay adapter for each entry of `station.remotes`
    pub remote_kinds: Vec<RemoteKind>,
    pub exports: Vec<PlaylistExport>,
}

pub fn host_utc_offset() -> i32 {
    Local::now().offset().fix().local_minus_utc()
}

pub fn compile(snapshot: &StationSnapshot, ctx: &CompileContext) -> Result<String> {
    compile_with(&SectionPipeline::standard(), snapshot, ctx)
}

/// Run `pipeline` over the snapshot; the first section also owns the file header
pub fn compile_with(
    pipeline: &SectionPipeline,
    snapshot: &StationSnapshot,
    ctx: &CompileContext,
) -> Result<String> {
    validate(snapshot)?;

    let mut doc = ConfigDocument::new();
    let first = pipeline.first();

    for section in pipeline.sections() {
        debug!(station_id = snapshot.station.id, ?section, "Writing section");
        if Some(section) == first {
            sections::write_file_header(&mut doc, &snapshot.station);
        }

        match section {
            Section::Header => sections::write_header(&mut doc, snapshot, ctx),
            Section::Playlists => sections::write_playlists(&mut doc, snapshot, ctx)?,
            Section::Harbor => sections::write_harbor(&mut doc, &snapshot.station),
            Section::Custom => sections::write_custom(&mut doc, &snapshot.station),
            Section::LocalBroadcasts => sections::write_local_broadcasts(&mut doc, &snapshot.station),
            Section::RemoteBroadcasts => sections::write_remote_broadcasts(&mut doc, snapshot),
        }
    }

    Ok(doc.build())
}

fn validate(snapshot: &StationSnapshot) -> Result<()> {
    let station = &snapshot.station;

    if snapshot.remote_kinds.len() != station.remotes.len() {
        return Err(Error::Compile(format!(
            "Station {} has {} remotes but {} resolved relay adapters",
            station.id,
            station.remotes.len(),
            snapshot.remote_kinds.len()
        )));
    }

    let mut seen = HashSet::new();
    for playlist in station.enabled_playlists() {
        let var = playlist_var(playlist);
        if !seen.insert(var.clone()) {
            return Err(Error::Compile(format!(
                "Playlist '{}' collides with another playlist as {}",
                playlist.name, var
            )));
        }
    }

    Ok(())
}
