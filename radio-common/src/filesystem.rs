//! Station directory layout
//!
//! Each station owns `<base>/config`, `<base>/playlists` and `<base>/media`, where
//! `<base>` is the station's explicit radio directory or `<stations_root>/<short_name>`.

use crate::models::Station;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StationFilesystem {
    stations_root: PathBuf,
}

impl StationFilesystem {
    pub fn new(stations_root: impl Into<PathBuf>) -> Self {
        Self {
            stations_root: stations_root.into(),
        }
    }

    pub fn base_dir(&self, station: &Station) -> PathBuf {
        if let Some(dir) = &station.radio_base_dir {
            return dir.clone();
        }

        let short_name = station.safe_short_name();
        if short_name.is_empty() {
            self.stations_root.join(format!("station_{}", station.id))
        } else {
            self.stations_root.join(short_name)
        }
    }

    pub fn config_dir(&self, station: &Station) -> PathBuf {
        self.base_dir(station).join("config")
    }

    pub fn playlists_dir(&self, station: &Station) -> PathBuf {
        self.base_dir(station).join("playlists")
    }

    pub fn media_dir(&self, station: &Station) -> PathBuf {
        self.base_dir(station).join("media")
    }

    /// Resolve a media path stored relative to the station media directory.
    ///
    /// Leading separators and `..`/`.` components are dropped so a stored path can
    /// never point outside the media directory.
    pub fn full_media_path(&self, station: &Station, relative: &str) -> PathBuf {
        let mut path = self.media_dir(station);
        for component in Path::new(relative).components() {
            if let Component::Normal(part) = component {
                path.push(part);
            }
        }
        path
    }
}
