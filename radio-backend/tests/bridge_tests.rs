//! Runtime bridge tests: next-song annotations and DJ authentication

mod helpers;

use helpers::MemoryRepository;
use radio_backend::RuntimeBridge;
use radio_common::models::{NextSong, Station, StationMedia};
use radio_common::StationFilesystem;
use std::path::PathBuf;
use std::sync::Arc;

fn bridge_for(repo: &MemoryRepository) -> RuntimeBridge {
    RuntimeBridge::new(
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        StationFilesystem::new("/srv/stations"),
        PathBuf::from("/usr/share/radio/error.mp3"),
    )
}

fn station() -> Station {
    let mut station = Station::new(1, "Test Radio");
    station.frontend_config.source_pw = Some("hackme".to_string());
    station
}

#[tokio::test]
async fn test_source_password_is_accepted_without_streamer() {
    let repo = MemoryRepository::with_station(station());
    let bridge = bridge_for(&repo);

    assert!(bridge.authenticate(&station(), "shoutcast", "hackme").await.unwrap());
    assert_eq!(repo.station_now(1).current_streamer_id, None);
}

#[tokio::test]
async fn test_packed_credentials_authenticate_streamer() {
    let repo = MemoryRepository::with_station(station());
    repo.add_streamer(5, 1, "alice", "secret");
    let bridge = bridge_for(&repo);

    assert!(bridge.authenticate(&station(), "shoutcast", "alice:secret").await.unwrap());
    assert_eq!(repo.station_now(1).current_streamer_id, Some(5));
}

#[tokio::test]
async fn test_wrong_credentials_are_rejected() {
    let repo = MemoryRepository::with_station(station());
    repo.add_streamer(5, 1, "alice", "secret");
    let bridge = bridge_for(&repo);

    assert!(!bridge.authenticate(&station(), "alice", "nope").await.unwrap());
    assert!(!bridge.authenticate(&station(), "shoutcast", "alice,nope").await.unwrap());
    assert_eq!(repo.station_now(1).current_streamer_id, None);
}

#[tokio::test]
async fn test_current_streamer_failure_does_not_block_login() {
    let repo = MemoryRepository::with_station(station());
    repo.add_streamer(5, 1, "alice", "secret");
    repo.state.lock().unwrap().fail_set_current = true;
    let bridge = bridge_for(&repo);

    assert!(bridge.authenticate(&station(), "alice", "secret").await.unwrap());
}

#[tokio::test]
async fn test_next_song_annotates_library_media() {
    let repo = MemoryRepository::with_station(station());
    repo.state.lock().unwrap().queue.push_back(NextSong::Media(StationMedia {
        id: 100,
        song_id: "abc".to_string(),
        path: "rock/one.mp3".to_string(),
        title: Some("One".to_string()),
        artist: Some("Band".to_string()),
        length: Some(200.5),
        fade_out: Some(2.0),
        ..StationMedia::default()
    }));
    let bridge = bridge_for(&repo);

    let track = bridge.next_song(&station(), true).await.unwrap();

    assert_eq!(
        track,
        "annotate:title=\"One\",artist=\"Band\",song_id=\"abc\",media_id=\"100\",length=\"200.50\",liq_fade_out=\"2.\":/srv/stations/test_radio/media/rock/one.mp3"
    );
}

#[tokio::test]
async fn test_next_song_custom_uri_and_raw() {
    let repo = MemoryRepository::with_station(station());
    {
        let mut state = repo.state.lock().unwrap();
        state.queue.push_back(NextSong::CustomUri {
            uri: "http://example.com/jingle.mp3".to_string(),
            duration: Some(12.0),
        });
        state.queue.push_back(NextSong::CustomUri {
            uri: "http://example.com/stream".to_string(),
            duration: None,
        });
        state.queue.push_back(NextSong::Raw("/media/raw.mp3".to_string()));
    }
    let bridge = bridge_for(&repo);

    assert_eq!(
        bridge.next_song(&station(), true).await.unwrap(),
        "annotate:length=\"12.\":http://example.com/jingle.mp3"
    );
    assert_eq!(bridge.next_song(&station(), true).await.unwrap(), "http://example.com/stream");
    assert_eq!(bridge.next_song(&station(), true).await.unwrap(), "/media/raw.mp3");
}

#[tokio::test]
async fn test_next_song_falls_back_to_error_sound() {
    let repo = MemoryRepository::with_station(station());
    let bridge = bridge_for(&repo);

    assert_eq!(
        bridge.next_song(&station(), false).await.unwrap(),
        "/usr/share/radio/error.mp3"
    );
}

#[tokio::test]
async fn test_toggle_live_persists_flag() {
    let repo = MemoryRepository::with_station(station());
    let bridge = bridge_for(&repo);

    bridge.toggle_live(&station(), true).await.unwrap();
    assert!(repo.station_now(1).is_streamer_live);

    bridge.toggle_live(&station(), false).await.unwrap();
    assert!(!repo.station_now(1).is_streamer_live);
}
