//! Scheduling graph
//!
//! Turns a station's enabled playlists into the layered source graph the engine
//! plays from:
//!
//! 1. a weighted random rotation over the standard playlists,
//! 2. once-per-N-songs playlists rotated into it (`[1, N]`),
//! 3. once-per-N-minutes playlists layered on top through delayed fallbacks,
//! 4. a switch whose arms are the scheduled and once-per-day playlists in
//!    declaration order, ending with a catch-all arm for the rotation,
//! 5. the request layer (manual queue or dynamic next-song requests) falling
//!    back to that switch and finally to silence.
//!
//! The graph can be rendered to script lines and evaluated against a simulated
//! engine clock, which is how the switch precedence is checked.

use super::format::{float, shifted_time, var_name};
use crate::error::{Error, Result};
use chrono::Weekday;
use radio_common::models::{Playlist, PlaylistType, Station};

/// Seconds the engine waits on a dynamic request before falling back
pub const DYNAMIC_REQUEST_TIMEOUT: f64 = 20.0;

/// Length of the silence used as the last fallback
pub const SILENCE_DURATION: f64 = 2.0;

/// Name of the script function that asks this service for the next track
pub const NEXT_SONG_FUNCTION: &str = "radio_next_song";

pub fn playlist_var(playlist: &Playlist) -> String {
    format!("playlist_{}", playlist.short_name())
}

// ========================================
// Predicates
// ========================================

/// Point in time as the engine sees it (already offset-shifted)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineInstant {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
}

impl EngineInstant {
    pub fn new(weekday: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            weekday,
            hour,
            minute,
        }
    }

    fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    /// `start-end`, start inclusive, end exclusive, wrapping past midnight
    Window { start: (u32, u32), end: (u32, u32) },
    /// A single minute of the day
    At((u32, u32)),
}

impl TimeSpec {
    fn render(&self) -> String {
        match self {
            TimeSpec::Window { start, end } => {
                format!("{}h{}m-{}h{}m", start.0, start.1, end.0, end.1)
            }
            TimeSpec::At((h, m)) => format!("{}h{}m", h, m),
        }
    }

    fn matches(&self, at: &EngineInstant) -> bool {
        let now = at.minute_of_day();
        match self {
            TimeSpec::Window { start, end } => {
                let start = start.0 * 60 + start.1;
                let end = end.0 * 60 + end.1;
                if start < end {
                    now >= start && now < end
                } else if start > end {
                    now >= start || now < end
                } else {
                    now == start
                }
            }
            TimeSpec::At((h, m)) => now == h * 60 + m,
        }
    }
}

/// Day-of-week and time guard of one switch arm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmPredicate {
    /// Empty means every day
    pub days: Vec<Weekday>,
    pub time: TimeSpec,
}

impl ArmPredicate {
    pub fn render(&self) -> String {
        if self.days.is_empty() {
            return self.time.render();
        }

        let days: Vec<String> = self
            .days
            .iter()
            .map(|d| format!("{}w", d.num_days_from_sunday()))
            .collect();

        format!("({}) and {}", days.join(" or "), self.time.render())
    }

    pub fn matches(&self, at: &EngineInstant) -> bool {
        (self.days.is_empty() || self.days.contains(&at.weekday)) && self.time.matches(at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleArm {
    pub predicate: ArmPredicate,
    pub source: String,
}

/// What the schedule switch selects at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSource<'a> {
    Scheduled(&'a str),
    Rotation,
}

// ========================================
// Graph
// ========================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestLayer {
    /// Tracks play only when pushed onto this queue
    Manual { queue_id: String },
    /// The engine polls the next-song callback
    Dynamic { request_id: String, cue_cut_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleGraph {
    /// `(source, weight)` of every standard playlist, in declaration order
    pub rotation: Vec<(String, u32)>,
    /// `(source, songs)` interleaved with the rotation
    pub song_layers: Vec<(String, u32)>,
    /// `(source, minutes)` delayed fallbacks over the rotation
    pub minute_layers: Vec<(String, u32)>,
    pub arms: Vec<ScheduleArm>,
    pub requests: RequestLayer,
    pub fallback_id: String,
}

impl ScheduleGraph {
    /// Build the graph from the station's enabled playlists in declaration order.
    ///
    /// Fails when a playlist's timing fields cannot produce a valid layer.
    pub fn build(station: &Station, playlists: &[&Playlist], utc_offset_secs: i32) -> Result<Self> {
        let mut rotation = Vec::new();
        let mut song_layers = Vec::new();
        let mut minute_layers = Vec::new();
        let mut arms = Vec::new();

        for playlist in playlists {
            let source = playlist_var(playlist);

            match playlist.playlist_type {
                PlaylistType::Default => rotation.push((source, playlist.weight)),
                PlaylistType::OncePerXSongs => {
                    if playlist.play_per_songs == 0 {
                        return Err(invalid(playlist, "song interval must be positive"));
                    }
                    song_layers.push((source, playlist.play_per_songs));
                }
                PlaylistType::OncePerXMinutes => {
                    if playlist.play_per_minutes == 0 {
                        return Err(invalid(playlist, "minute interval must be positive"));
                    }
                    minute_layers.push((source, playlist.play_per_minutes));
                }
                PlaylistType::Scheduled => {
                    let start = time_of(playlist, playlist.schedule_start_time, utc_offset_secs)?;
                    let end = time_of(playlist, playlist.schedule_end_time, utc_offset_secs)?;
                    arms.push(ScheduleArm {
                        predicate: ArmPredicate {
                            days: playlist.schedule_days.clone(),
                            time: TimeSpec::Window { start, end },
                        },
                        source,
                    });
                }
                PlaylistType::OncePerDay => {
                    let at = time_of(playlist, playlist.play_once_time, utc_offset_secs)?;
                    arms.push(ScheduleArm {
                        predicate: ArmPredicate {
                            days: playlist.play_once_days.clone(),
                            time: TimeSpec::At(at),
                        },
                        source,
                    });
                }
                PlaylistType::Advanced => {}
            }
        }

        if rotation.is_empty() {
            return Err(Error::Compile(format!(
                "Station {} has no enabled standard playlist",
                station.id
            )));
        }

        let requests = if station.manual_autodj {
            RequestLayer::Manual {
                queue_id: var_name(station, "requests"),
            }
        } else {
            RequestLayer::Dynamic {
                request_id: var_name(station, "next_song"),
                cue_cut_id: var_name(station, "cue_cut"),
            }
        };

        Ok(Self {
            rotation,
            song_layers,
            minute_layers,
            arms,
            requests,
            fallback_id: var_name(station, "playlist_fallback"),
        })
    }

    /// Whether the final fallback waits for the current track to end
    pub fn track_sensitive(&self) -> bool {
        matches!(self.requests, RequestLayer::Manual { .. })
    }

    /// First matching switch arm, else the rotation
    pub fn active_source(&self, at: EngineInstant) -> ActiveSource<'_> {
        self.arms
            .iter()
            .find(|arm| arm.predicate.matches(&at))
            .map(|arm| ActiveSource::Scheduled(arm.source.as_str()))
            .unwrap_or(ActiveSource::Rotation)
    }

    /// Script lines from the rotation through the final fallback
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let weights: Vec<String> = self.rotation.iter().map(|(_, w)| w.to_string()).collect();
        let sources: Vec<&str> = self.rotation.iter().map(|(s, _)| s.as_str()).collect();
        lines.push("# Standard Playlists".to_string());
        lines.push(format!(
            "radio = random(weights=[{}], [{}])",
            weights.join(", "),
            sources.join(", ")
        ));
        lines.push(String::new());

        if !self.song_layers.is_empty() {
            lines.push("# Once per x Songs Playlists".to_string());
            for (source, songs) in &self.song_layers {
                lines.push(format!("radio = rotate(weights=[1,{}], [{}, radio])", songs, source));
            }
            lines.push(String::new());
        }

        if !self.minute_layers.is_empty() {
            lines.push("# Once per x Minutes Playlists".to_string());
            for (source, minutes) in &self.minute_layers {
                let seconds = f64::from(*minutes) * 60.0;
                lines.push(format!("delay_{} = delay({}, {})", source, float(seconds), source));
                lines.push(format!("radio = fallback([delay_{}, radio])", source));
            }
            lines.push(String::new());
        }

        lines.push("# Assemble final playback order".to_string());
        let request_source = match &self.requests {
            RequestLayer::Manual { queue_id } => {
                lines.push(format!(
                    "requests = audio_to_stereo(request.queue(id=\"{}\"))",
                    queue_id
                ));
                "requests"
            }
            RequestLayer::Dynamic {
                request_id,
                cue_cut_id,
            } => {
                lines.push(format!(
                    "dynamic = audio_to_stereo(request.dynamic(id=\"{}\", timeout={}, {}))",
                    request_id,
                    float(DYNAMIC_REQUEST_TIMEOUT),
                    NEXT_SONG_FUNCTION
                ));
                lines.push(format!("dynamic = cue_cut(id=\"{}\", dynamic)", cue_cut_id));
                "dynamic"
            }
        };

        let mut arms: Vec<String> = self
            .arms
            .iter()
            .map(|arm| format!("({{ {} }}, {})", arm.predicate.render(), arm.source))
            .collect();
        arms.push("({ true }, radio)".to_string());

        lines.push(format!(
            "radio = fallback(id=\"{}\", track_sensitive = {}, [{}, switch([ {} ]), blank(duration={})])",
            self.fallback_id,
            self.track_sensitive(),
            request_source,
            arms.join(", "),
            float(SILENCE_DURATION)
        ));

        lines
    }
}

fn invalid(playlist: &Playlist, reason: &str) -> Error {
    Error::Compile(format!("Playlist '{}' ({}): {}", playlist.name, playlist.id, reason))
}

fn time_of(playlist: &Playlist, time_code: u32, utc_offset_secs: i32) -> Result<(u32, u32)> {
    if time_code / 100 > 23 || time_code % 100 > 59 {
        return Err(invalid(playlist, &format!("invalid time {:04}", time_code)));
    }
    Ok(shifted_time(time_code, utc_offset_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(id: i64, name: &str, playlist_type: PlaylistType) -> Playlist {
        let mut p = Playlist::new(1, name);
        p.id = id;
        p.playlist_type = playlist_type;
        p
    }

    #[test]
    fn test_predicate_render_with_days() {
        let predicate = ArmPredicate {
            days: vec![Weekday::Mon, Weekday::Sun],
            time: TimeSpec::Window {
                start: (10, 0),
                end: (12, 30),
            },
        };
        assert_eq!(predicate.render(), "(1w or 0w) and 10h0m-12h30m");
    }

    #[test]
    fn test_window_wraps_midnight() {
        let time = TimeSpec::Window {
            start: (22, 0),
            end: (2, 0),
        };
        assert!(time.matches(&EngineInstant::new(Weekday::Fri, 23, 15)));
        assert!(time.matches(&EngineInstant::new(Weekday::Fri, 1, 59)));
        assert!(!time.matches(&EngineInstant::new(Weekday::Fri, 2, 0)));
        assert!(!time.matches(&EngineInstant::new(Weekday::Fri, 12, 0)));
    }

    #[test]
    fn test_zero_song_interval_is_rejected() {
        let station = Station::new(1, "Test");
        let base = playlist(1, "base", PlaylistType::Default);
        let broken = playlist(2, "jingles", PlaylistType::OncePerXSongs);

        let err = ScheduleGraph::build(&station, &[&base, &broken], 0).unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn test_invalid_time_is_rejected() {
        let station = Station::new(1, "Test");
        let base = playlist(1, "base", PlaylistType::Default);
        let mut show = playlist(2, "show", PlaylistType::Scheduled);
        show.schedule_start_time = 2500;
        show.schedule_end_time = 2600;

        assert!(ScheduleGraph::build(&station, &[&base, &show], 0).is_err());
    }

    #[test]
    fn test_layers_render_in_type_order() {
        let station = Station::new(1, "Test");
        let base = playlist(1, "base", PlaylistType::Default);
        let mut minutes = playlist(2, "ids", PlaylistType::OncePerXMinutes);
        minutes.play_per_minutes = 30;
        let mut songs = playlist(3, "jingles", PlaylistType::OncePerXSongs);
        songs.play_per_songs = 5;

        let graph = ScheduleGraph::build(&station, &[&base, &minutes, &songs], 0).unwrap();
        let lines = graph.render();

        let rotate = lines.iter().position(|l| l.contains("rotate(")).unwrap();
        let delay = lines.iter().position(|l| l.contains("delay(")).unwrap();
        assert!(rotate < delay);
        assert!(lines.contains(&"radio = rotate(weights=[1,5], [playlist_jingles, radio])".to_string()));
        assert!(lines.contains(&"delay_playlist_ids = delay(1800., playlist_ids)".to_string()));
        assert!(lines.contains(&"radio = fallback([delay_playlist_ids, radio])".to_string()));
    }

    #[test]
    fn test_advanced_playlists_stay_out_of_graph() {
        let station = Station::new(1, "Test");
        let base = playlist(1, "base", PlaylistType::Default);
        let advanced = playlist(2, "special", PlaylistType::Advanced);

        let graph = ScheduleGraph::build(&station, &[&base, &advanced], 0).unwrap();
        assert!(!graph.render().iter().any(|l| l.contains("playlist_special")));
    }
}
