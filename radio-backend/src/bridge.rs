//! Runtime bridge
//!
//! Server side of the engine's callbacks: next-song lookups, live DJ
//! authentication and live-status updates. Reached either through the
//! `internal` CLI subcommands or the internal HTTP router.

use crate::error::Result;
use crate::liquidsoap::format::{clean_up_string, float};
use radio_common::models::{NextSong, Station, StationMedia};
use radio_common::{NextSongProvider, StationFilesystem, StationRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Track reference handed to the engine, optionally carrying `annotate:` metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotatedTrack {
    path: String,
    annotations: Vec<(String, String)>,
}

impl AnnotatedTrack {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            annotations: Vec::new(),
        }
    }

    pub fn annotate(&mut self, key: &str, value: impl AsRef<str>) -> &mut Self {
        self.annotations
            .push((key.to_string(), clean_up_string(value.as_ref())));
        self
    }

    fn annotate_opt(&mut self, key: &str, value: Option<f64>) -> &mut Self {
        if let Some(value) = value {
            self.annotate(key, float(value));
        }
        self
    }

    pub fn with_media(mut self, media: &StationMedia) -> Self {
        if let Some(title) = &media.title {
            self.annotate("title", title);
        }
        if let Some(artist) = &media.artist {
            self.annotate("artist", artist);
        }
        if !media.song_id.is_empty() {
            self.annotate("song_id", &media.song_id);
        }
        self.annotate("media_id", media.id.to_string());
        self.annotate_opt("length", media.length)
            .annotate_opt("liq_cue_in", media.cue_in)
            .annotate_opt("liq_cue_out", media.cue_out)
            .annotate_opt("liq_fade_in", media.fade_in)
            .annotate_opt("liq_fade_out", media.fade_out);
        if let Some(amplify) = media.amplify {
            self.annotate("liq_amplify", format!("{}dB", float(amplify)));
        }
        self
    }

    /// `annotate:k="v",...:path`, or the bare path without annotations
    pub fn render(&self) -> String {
        if self.annotations.is_empty() {
            return self.path.clone();
        }

        let pairs: Vec<String> = self
            .annotations
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect();
        format!("annotate:{}:{}", pairs.join(","), self.path)
    }
}

/// Split credentials a DJ client packed into the password field.
///
/// `user,pass` is tried first, then `user:pass`; anything past a second
/// separator is dropped.
pub fn split_credentials<'a>(user: &'a str, password: &'a str) -> (&'a str, &'a str) {
    let (mut user, mut password) = (user, password);

    for separator in [',', ':'] {
        if password.contains(separator) {
            let mut parts = password.split(separator);
            user = parts.next().unwrap_or_default();
            password = parts.next().unwrap_or_default();
        }
    }

    (user, password)
}

pub struct RuntimeBridge {
    repo: Arc<dyn StationRepository>,
    scheduler: Arc<dyn NextSongProvider>,
    filesystem: StationFilesystem,
    error_sound: PathBuf,
}

impl RuntimeBridge {
    pub fn new(
        repo: Arc<dyn StationRepository>,
        scheduler: Arc<dyn NextSongProvider>,
        filesystem: StationFilesystem,
        error_sound: PathBuf,
    ) -> Self {
        Self {
            repo,
            scheduler,
            filesystem,
            error_sound,
        }
    }

    pub fn repository(&self) -> &Arc<dyn StationRepository> {
        &self.repo
    }

    /// Track reference for the engine's next request
    pub async fn next_song(&self, station: &Station, as_autodj: bool) -> Result<String> {
        let decision = self.scheduler.next_song(station, as_autodj).await?;

        let track = match decision {
            Some(NextSong::Media(media)) => {
                let path = self.filesystem.full_media_path(station, &media.path);
                AnnotatedTrack::new(path.display().to_string()).with_media(&media)
            }
            Some(NextSong::CustomUri { uri, duration }) => {
                let mut track = AnnotatedTrack::new(uri);
                track.annotate_opt("length", duration.filter(|d| *d > 0.0));
                track
            }
            Some(NextSong::Raw(reference)) => AnnotatedTrack::new(reference),
            None => {
                info!(station_id = station.id, "Scheduler returned nothing, playing error sound");
                AnnotatedTrack::new(self.error_sound.display().to_string())
            }
        };

        let rendered = track.render();
        debug!(station_id = station.id, track = %rendered, "Next song");
        Ok(rendered)
    }

    /// Validate a live DJ login
    pub async fn authenticate(&self, station: &Station, user: &str, password: &str) -> Result<bool> {
        if let Some(source_pw) = station.frontend_config.source_pw.as_deref() {
            if !source_pw.is_empty() && source_pw == password {
                return Ok(true);
            }
        }

        let (user, password) = split_credentials(user, password);

        let Some(streamer) = self
            .repo
            .authenticate_streamer(station.id, user, password)
            .await?
        else {
            info!(station_id = station.id, username = user, "DJ authentication rejected");
            return Ok(false);
        };

        debug!(station_id = station.id, username = user, "DJ authenticated");
        if let Err(e) = self.repo.set_current_streamer(station.id, Some(streamer.id)).await {
            error!(station_id = station.id, streamer_id = streamer.id, "Cannot record current streamer: {}", e);
        }

        Ok(true)
    }

    pub async fn toggle_live(&self, station: &Station, is_live: bool) -> Result<()> {
        info!(station_id = station.id, is_live, "Live status changed");
        self.repo.set_streamer_live(station.id, is_live).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_credentials() {
        assert_eq!(split_credentials("shoutcast", "alice:secret"), ("alice", "secret"));
        assert_eq!(split_credentials("shoutcast", "alice,secret"), ("alice", "secret"));
        assert_eq!(split_credentials("bob", "plain"), ("bob", "plain"));
        assert_eq!(split_credentials("x", "a,b:c"), ("b", "c"));
    }

    #[test]
    fn test_bare_path_without_annotations() {
        assert_eq!(AnnotatedTrack::new("/media/a.mp3").render(), "/media/a.mp3");
    }

    #[test]
    fn test_media_annotations() {
        let media = StationMedia {
            id: 42,
            song_id: "abc".to_string(),
            path: "a.mp3".to_string(),
            title: Some("Say \"Hi\"".to_string()),
            artist: Some("Band".to_string()),
            length: Some(200.0),
            cue_in: Some(1.5),
            amplify: Some(-3.5),
            ..StationMedia::default()
        };

        let rendered = AnnotatedTrack::new("/media/a.mp3").with_media(&media).render();
        assert_eq!(
            rendered,
            "annotate:title=\"Say 'Hi'\",artist=\"Band\",song_id=\"abc\",media_id=\"42\",length=\"200.\",liq_cue_in=\"1.50\",liq_amplify=\"-3.50dB\":/media/a.mp3"
        );
    }
}
