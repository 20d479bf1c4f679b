//! Shared fixtures: an in-memory station store and a scripted control-socket engine

#![allow(dead_code)]

use async_trait::async_trait;
use radio_backend::liquidsoap::Liquidsoap;
use radio_common::config::TomlConfig;
use radio_common::models::{NextSong, Playlist, Station, Streamer};
use radio_common::{NextSongProvider, Result, StationRepository};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

// ========================================
// In-memory store
// ========================================

#[derive(Default)]
pub struct MemoryState {
    pub stations: HashMap<i64, Station>,
    pub media: HashMap<i64, Vec<String>>,
    /// username -> (password, streamer)
    pub streamers: HashMap<String, (String, Streamer)>,
    pub queue: VecDeque<NextSong>,
    pub deactivations: Vec<(i64, u32)>,
    pub next_playlist_id: i64,
    pub fail_set_current: bool,
}

#[derive(Default, Clone)]
pub struct MemoryRepository {
    pub state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn with_station(station: Station) -> Self {
        let repo = Self::default();
        {
            let mut state = repo.state.lock().unwrap();
            state.next_playlist_id = 1000;
            state.stations.insert(station.id, station);
        }
        repo
    }

    pub fn add_streamer(&self, id: i64, station_id: i64, username: &str, password: &str) {
        let streamer = Streamer {
            id,
            station_id,
            username: username.to_string(),
            display_name: None,
            is_active: true,
            reactivate_at: None,
        };
        self.state
            .lock()
            .unwrap()
            .streamers
            .insert(username.to_string(), (password.to_string(), streamer));
    }

    pub fn station_now(&self, station_id: i64) -> Station {
        self.state.lock().unwrap().stations[&station_id].clone()
    }
}

fn not_found(what: String) -> radio_common::Error {
    radio_common::Error::NotFound(what)
}

#[async_trait]
impl StationRepository for MemoryRepository {
    async fn station(&self, station_id: i64) -> Result<Station> {
        self.state
            .lock()
            .unwrap()
            .stations
            .get(&station_id)
            .cloned()
            .ok_or_else(|| not_found(format!("station {}", station_id)))
    }

    async fn playlist_media(&self, playlist_id: i64) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .media
            .get(&playlist_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_default_playlist(&self, station_id: i64, name: &str) -> Result<Playlist> {
        let mut state = self.state.lock().unwrap();
        state.next_playlist_id += 1;
        let mut playlist = Playlist::new(station_id, name);
        playlist.id = state.next_playlist_id;

        let station = state
            .stations
            .get_mut(&station_id)
            .ok_or_else(|| not_found(format!("station {}", station_id)))?;
        station.playlists.push(playlist.clone());
        Ok(playlist)
    }

    async fn authenticate_streamer(
        &self,
        station_id: i64,
        username: &str,
        password: &str,
    ) -> Result<Option<Streamer>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .streamers
            .get(username)
            .filter(|(pw, s)| pw == password && s.station_id == station_id)
            .map(|(_, s)| s.clone()))
    }

    async fn streamer(&self, streamer_id: i64) -> Result<Streamer> {
        self.state
            .lock()
            .unwrap()
            .streamers
            .values()
            .find(|(_, s)| s.id == streamer_id)
            .map(|(_, s)| s.clone())
            .ok_or_else(|| not_found(format!("streamer {}", streamer_id)))
    }

    async fn set_current_streamer(&self, station_id: i64, streamer_id: Option<i64>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_set_current {
            return Err(radio_common::Error::Config("store is read-only".to_string()));
        }
        if let Some(station) = state.stations.get_mut(&station_id) {
            station.current_streamer_id = streamer_id;
        }
        Ok(())
    }

    async fn deactivate_streamer(&self, streamer_id: i64, seconds: u32) -> Result<()> {
        self.state.lock().unwrap().deactivations.push((streamer_id, seconds));
        Ok(())
    }

    async fn set_streamer_live(&self, station_id: i64, is_live: bool) -> Result<()> {
        if let Some(station) = self.state.lock().unwrap().stations.get_mut(&station_id) {
            station.is_streamer_live = is_live;
        }
        Ok(())
    }
}

#[async_trait]
impl NextSongProvider for MemoryRepository {
    async fn next_song(&self, _station: &Station, _as_autodj: bool) -> Result<Option<NextSong>> {
        Ok(self.state.lock().unwrap().queue.pop_front())
    }
}

// ========================================
// Backend construction
// ========================================

pub fn test_config(stations_root: &Path) -> TomlConfig {
    TomlConfig {
        stations_root: stations_root.to_path_buf(),
        telnet_host: "127.0.0.1".to_string(),
        connect_timeout_secs: 2,
        command_timeout_secs: 5,
        liquidsoap_binaries: Vec::new(),
        ..TomlConfig::default()
    }
}

pub fn test_liquidsoap(stations_root: &Path) -> Liquidsoap {
    Liquidsoap::from_config(&test_config(stations_root))
}

// ========================================
// Mock engine
// ========================================

type Responder = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Telnet server answering like the engine: response lines, `END`, and `Bye!` on quit
pub struct MockEngine {
    pub port: u16,
    pub commands: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);

        let seen = commands.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let seen = seen.clone();
                let responder = responder.clone();
                tokio::spawn(async move {
                    let (read, mut write) = socket.into_split();
                    let mut lines = BufReader::new(read).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        if line == "quit" {
                            let _ = write.write_all(b"Bye!\r\n").await;
                            break;
                        }
                        seen.lock().unwrap().push(line.clone());
                        for response in responder(&line) {
                            let _ = write.write_all(format!("{}\r\n", response).as_bytes()).await;
                        }
                        let _ = write.write_all(b"END\r\n").await;
                    }
                });
            }
        });

        Self { port, commands }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

/// Responder that keeps a request queue the way the engine does:
/// `.push` hands out a request id, `.queue` lists pending ids on one line.
pub fn request_queue_responder() -> impl Fn(&str) -> Vec<String> + Send + Sync + 'static {
    let pending = Arc::new(Mutex::new(Vec::<String>::new()));

    move |cmd: &str| {
        let mut pending = pending.lock().unwrap();
        if cmd.ends_with(".queue") {
            vec![pending.join(" ")]
        } else if cmd.contains(".push ") {
            let id = (pending.len() + 1).to_string();
            pending.push(id.clone());
            vec![id]
        } else {
            Vec::new()
        }
    }
}

/// Port nobody listens on
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
