//! Section writers
//!
//! Each writer appends one part of the program. They run in the pipeline's
//! priority order, and later parts reassign `radio` built by earlier ones.

use super::compiler::{CompileContext, StationSnapshot};
use super::document::ConfigDocument;
use super::format::{clean_up_string, float, round_to, var_name};
use super::schedule::{playlist_var, ScheduleGraph, NEXT_SONG_FUNCTION};
use super::{stream_port, telnet_port, CONFIG_FILE_NAME};
use crate::error::Result;
use radio_common::config::CallbackConfig;
use radio_common::models::{
    AudioFormat, AutoDjOutput, Playlist, PlaylistOrder, PlaylistSource, PlaylistType,
    RemotePlaylistType, Station,
};

/// Seconds of buffering for remote stream playlists
const REMOTE_STREAM_MAX: f64 = 20.0;

/// Seconds of buffering for the live harbor input
const HARBOR_MAX: f64 = 30.0;

pub fn write_file_header(doc: &mut ConfigDocument, station: &Station) {
    doc.prepend_lines([
        "# WARNING! This file is automatically generated.".to_string(),
        "# Do not update it directly!".to_string(),
        format!("# Station: {} ({})", clean_up_string(&station.name), station.id),
    ]);
}

// ========================================
// Header: runtime settings and callbacks
// ========================================

/// Shell command line the engine runs to reach one internal endpoint.
///
/// `params` pairs an argument name with an engine variable; the variable's
/// runtime value is shell-quoted by the engine through `string.quote`.
pub fn callback_command(
    station: &Station,
    ctx: &CompileContext,
    endpoint: &str,
    params: &[(&str, &str)],
) -> String {
    match &ctx.callback {
        CallbackConfig::Shell { cli_path } => {
            let mut command = format!(
                "{} internal {} {}",
                clean_up_string(cli_path),
                endpoint,
                station.id
            );
            for (key, value) in params {
                command.push_str(&format!(
                    " --{}=#{{string.quote({})}}",
                    key.replace('_', "-"),
                    value
                ));
            }
            command
        }
        CallbackConfig::Http { base_url } => {
            let mut command = format!(
                "curl -s --request POST --url {}/api/internal/{}/{}",
                clean_up_string(base_url.trim_end_matches('/')),
                station.id,
                endpoint
            );
            for (key, value) in params {
                command.push_str(&format!(
                    " --data-urlencode {}=#{{string.quote({})}}",
                    key, value
                ));
            }
            let api_key: String = station
                .adapter_api_key
                .as_deref()
                .unwrap_or_default()
                .chars()
                .filter(|c| !matches!(*c, '\'' | '"' | '\\' | '\n' | '\r'))
                .collect();
            command.push_str(&format!(" --data-urlencode 'api_auth={}'", api_key));
            command
        }
    }
}

pub fn write_header(doc: &mut ConfigDocument, snapshot: &StationSnapshot, ctx: &CompileContext) {
    let station = &snapshot.station;
    let config_dir = clean_up_string(&snapshot.config_dir.display().to_string());
    let pid_file = CONFIG_FILE_NAME.replace(".liq", ".pid");
    let log_file = CONFIG_FILE_NAME.replace(".liq", ".log");

    doc.append_line("set(\"init.daemon\", false)");
    doc.append_line(format!("set(\"init.daemon.pidfile.path\",\"{}/{}\")", config_dir, pid_file));
    doc.append_line(format!("set(\"log.file.path\",\"{}/{}\")", config_dir, log_file));
    if ctx.inside_docker {
        doc.append_line("set(\"log.stdout\", true)");
    }

    let bind_addr = if ctx.inside_docker { "0.0.0.0" } else { "127.0.0.1" };
    doc.append_lines([
        "set(\"server.telnet\",true)".to_string(),
        format!("set(\"server.telnet.bind_addr\",\"{}\")", bind_addr),
        format!("set(\"server.telnet.port\", {})", telnet_port(station)),
        "set(\"harbor.bind_addrs\",[\"0.0.0.0\"])".to_string(),
        String::new(),
        "set(\"tag.encodings\",[\"UTF-8\",\"ISO-8859-1\"])".to_string(),
        "set(\"encoder.encoder.export\",[\"artist\",\"title\",\"album\",\"song\"])".to_string(),
        String::new(),
    ]);

    let next_song = callback_command(station, ctx, "nextsong", &[]);
    let auth = callback_command(
        station,
        ctx,
        "auth",
        &[("dj_user", "user"), ("dj_password", "password")],
    );
    let djon = callback_command(station, ctx, "djon", &[]);
    let djoff = callback_command(station, ctx, "djoff", &[]);

    doc.append_lines([
        "# AutoDJ Next Song Script".to_string(),
        format!("def {}() =", NEXT_SONG_FUNCTION),
        format!("  uri = get_process_lines(\"{}\")", next_song),
        "  uri = list.hd(uri, default=\"\")".to_string(),
        "  log(\"Next song response: #{uri}\")".to_string(),
        String::new(),
        "  if uri == \"\" or string.match(pattern=\"Error\", uri) then".to_string(),
        "    log(\"Next song error: delaying subsequent requests...\")".to_string(),
        "    system(\"sleep 2\")".to_string(),
        "    request.create(\"\")".to_string(),
        "  else".to_string(),
        "    request.create(uri)".to_string(),
        "  end".to_string(),
        "end".to_string(),
        String::new(),
        "# DJ Authentication".to_string(),
        "def dj_auth(user,password) =".to_string(),
        "  log(\"Authenticating DJ: #{user}\")".to_string(),
        format!("  ret = get_process_lines(\"{}\")", auth),
        "  ret = list.hd(ret, default=\"\")".to_string(),
        "  log(\"DJ auth response: #{ret}\")".to_string(),
        "  bool_of_string(ret)".to_string(),
        "end".to_string(),
        String::new(),
        "live_enabled = ref false".to_string(),
        String::new(),
        "def live_connected(header) =".to_string(),
        "  log(\"DJ Source connected! #{header}\")".to_string(),
        "  live_enabled := true".to_string(),
        format!("  ret = get_process_lines(\"{}\")", djon),
        "  log(\"Live connected response: #{ret}\")".to_string(),
        "end".to_string(),
        String::new(),
        "def live_disconnected() =".to_string(),
        "  log(\"DJ Source disconnected!\")".to_string(),
        "  live_enabled := false".to_string(),
        format!("  ret = get_process_lines(\"{}\")", djoff),
        "  log(\"Live disconnected response: #{ret}\")".to_string(),
        "end".to_string(),
        String::new(),
    ]);
}

// ========================================
// Playlists
// ========================================

fn playlist_source(playlist: &Playlist, snapshot: &StationSnapshot) -> String {
    let var = playlist_var(playlist);

    match playlist.source {
        PlaylistSource::Songs => {
            let mode = match playlist.order {
                PlaylistOrder::Sequential => "normal",
                PlaylistOrder::Shuffle | PlaylistOrder::Random => "randomize",
            };
            let path = snapshot.playlists_dir.join(format!("{}.m3u", var));
            format!(
                "audio_to_stereo(playlist(reload_mode=\"watch\",mode=\"{}\",\"{}\"))",
                mode,
                clean_up_string(&path.display().to_string())
            )
        }
        PlaylistSource::RemoteUrl => {
            let url = clean_up_string(playlist.remote_url.as_deref().unwrap_or_default());
            match playlist.remote_type {
                RemotePlaylistType::Playlist => {
                    format!("audio_to_stereo(playlist(\"{}\"))", url)
                }
                RemotePlaylistType::Stream => {
                    let input = if url.starts_with("https:") {
                        "input.https"
                    } else {
                        "input.http"
                    };
                    format!(
                        "audio_to_stereo(mksafe({}(max={}, \"{}\")))",
                        input,
                        float(REMOTE_STREAM_MAX),
                        url
                    )
                }
            }
        }
    }
}

pub fn write_playlists(
    doc: &mut ConfigDocument,
    snapshot: &StationSnapshot,
    ctx: &CompileContext,
) -> Result<()> {
    let station = &snapshot.station;
    let playlists: Vec<&Playlist> = station.enabled_playlists().collect();

    let graph = ScheduleGraph::build(station, &playlists, ctx.utc_offset_secs)?;

    doc.append_line("# Playlists");
    for playlist in &playlists {
        let var = playlist_var(playlist);
        doc.append_line(format!("{} = {}", var, playlist_source(playlist, snapshot)));
        if playlist.playlist_type == PlaylistType::Advanced {
            doc.append_line(format!("ignore({})", var));
        }
    }
    doc.append_line("");

    doc.append_lines(graph.render());
    doc.append_line("");

    Ok(())
}

// ========================================
// Harbor
// ========================================

pub fn write_harbor(doc: &mut ConfigDocument, station: &Station) {
    let settings = &station.backend_config;
    let charset = clean_up_string(settings.charset());

    let params = [
        "\"/\"".to_string(),
        format!("id=\"{}\"", var_name(station, "input_streamer")),
        format!("port={}", stream_port(station)),
        "user=\"shoutcast\"".to_string(),
        "auth=dj_auth".to_string(),
        "icy=true".to_string(),
        format!("max={}", float(HARBOR_MAX)),
        format!("buffer={}", float(f64::from(settings.dj_buffer()))),
        format!("icy_metadata_charset=\"{}\"", charset),
        format!("metadata_charset=\"{}\"", charset),
        "on_connect=live_connected".to_string(),
        "on_disconnect=live_disconnected".to_string(),
    ];

    doc.append_lines([
        "# Pre-DJ source, kept for custom configuration".to_string(),
        "radio_without_live = radio".to_string(),
        "ignore(radio_without_live)".to_string(),
        String::new(),
        "# Live Broadcasting".to_string(),
        format!("live = audio_to_stereo(input.harbor({}))", params.join(", ")),
        "ignore(output.dummy(live, fallible=true))".to_string(),
        format!(
            "live = fallback(id=\"{}\", track_sensitive=false, [live, blank(duration=2.)])",
            var_name(station, "live_fallback")
        ),
        String::new(),
        format!(
            "radio = switch(id=\"{}\", track_sensitive=false, [({{!live_enabled}}, live), ({{true}}, radio)])",
            var_name(station, "live_switch")
        ),
        String::new(),
    ]);
}

// ========================================
// Custom
// ========================================

pub fn write_custom(doc: &mut ConfigDocument, station: &Station) {
    let settings = &station.backend_config;

    let crossfade = round_to(settings.crossfade(), 1);
    if crossfade > 0.0 {
        let start_next = round_to(crossfade * 1.5, 2);
        doc.append_lines([
            "# Crossfading".to_string(),
            format!(
                "radio = crossfade(start_next={},fade_out={},fade_in={},radio)",
                float(start_next),
                float(crossfade),
                float(crossfade)
            ),
        ]);
    }

    doc.append_lines([
        "# Telnet-driven custom metadata".to_string(),
        format!(
            "radio = server.insert_metadata(id=\"{}\", radio)",
            var_name(station, "custom_metadata")
        ),
        "# Per-track gain from annotations".to_string(),
        "radio = amplify(1., radio)".to_string(),
    ]);

    if let Some(custom) = settings.custom_config() {
        doc.append_line("# Custom Configuration (from station profile)");
        doc.append_line(custom);
    }

    doc.append_line("");
}

// ========================================
// Outputs
// ========================================

fn encoder(format: AudioFormat, bitrate: u32) -> String {
    match format {
        AudioFormat::Aac => format!(
            "%fdkaac(channels=2, samplerate=44100, bitrate={}, afterburner=true, aot=\"mpeg4_he_aac_v2\", transmux=\"adts\", sbr_mode=true)",
            bitrate
        ),
        AudioFormat::Ogg => format!("%vorbis.cbr(samplerate=44100, channels=2, bitrate={})", bitrate),
        AudioFormat::Opus => format!(
            "%opus(samplerate=48000, bitrate={}, vbr=\"none\", application=\"audio\", channels=2, signal=\"music\", complexity=10, max_bandwidth=\"full_band\")",
            bitrate
        ),
        AudioFormat::Mp3 => format!("%mp3(samplerate=44100, stereo=true, bitrate={}, id3v2=true)", bitrate),
    }
}

/// `output.icecast(...)` clause for one broadcast target
pub fn output_clause(station: &Station, output: &AutoDjOutput, purpose: &str, icy: bool) -> String {
    let mut params = vec![
        encoder(output.format, output.bitrate()),
        format!("id=\"{}\"", var_name(station, purpose)),
        format!("host = \"{}\"", clean_up_string(&output.host)),
        format!("port = {}", output.port),
    ];

    if let Some(user) = output.username.as_deref().filter(|u| !u.is_empty()) {
        params.push(format!("user = \"{}\"", clean_up_string(user)));
    }
    params.push(format!("password = \"{}\"", clean_up_string(&output.password)));
    if let Some(mount) = output.mount.as_deref().filter(|m| !m.is_empty()) {
        params.push(format!("mount = \"{}\"", clean_up_string(mount)));
    }

    params.push(format!("name = \"{}\"", clean_up_string(&station.name)));
    params.push(format!(
        "description = \"{}\"",
        clean_up_string(station.description.as_deref().unwrap_or_default())
    ));
    params.push(format!(
        "genre = \"{}\"",
        clean_up_string(station.genre.as_deref().unwrap_or_default())
    ));
    if let Some(url) = station.url.as_deref().filter(|u| !u.is_empty()) {
        params.push(format!("url = \"{}\"", clean_up_string(url)));
    }

    params.push(format!("public = {}", output.is_public));
    params.push(format!(
        "encoding = \"{}\"",
        clean_up_string(station.backend_config.charset())
    ));
    if icy || output.shoutcast_mode {
        params.push("protocol=\"icy\"".to_string());
    }
    params.push("radio".to_string());

    format!("output.icecast({})", params.join(", "))
}

/// Output ids number every mount, so disabled mounts leave gaps
pub fn write_local_broadcasts(doc: &mut ConfigDocument, station: &Station) {
    doc.append_line("# Local Broadcasts");
    for (i, mount) in station.mounts.iter().enumerate() {
        if mount.autodj.enabled {
            let purpose = format!("local_{}", i + 1);
            doc.append_line(output_clause(station, &mount.autodj, &purpose, false));
        }
    }
    doc.append_line("");
}

pub fn write_remote_broadcasts(doc: &mut ConfigDocument, snapshot: &StationSnapshot) {
    let station = &snapshot.station;

    doc.append_line("# Remote Relays");
    for (i, (remote, kind)) in station.remotes.iter().zip(&snapshot.remote_kinds).enumerate() {
        if remote.autodj.enabled {
            let purpose = format!("relay_{}", i + 1);
            doc.append_line(output_clause(
                station,
                &remote.autodj,
                &purpose,
                kind.uses_icy_protocol(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_callback_command() {
        let mut station = Station::new(7, "Test");
        station.adapter_api_key = Some("key".to_string());
        let ctx = CompileContext {
            callback: CallbackConfig::Shell {
                cli_path: "/opt/radio".to_string(),
            },
            ..CompileContext::default()
        };

        assert_eq!(
            callback_command(&station, &ctx, "auth", &[("dj_user", "user")]),
            "/opt/radio internal auth 7 --dj-user=#{string.quote(user)}"
        );
    }

    #[test]
    fn test_dj_credentials_are_shell_quoted_by_engine() {
        let ctx = CompileContext {
            callback: CallbackConfig::Http {
                base_url: "http://web".to_string(),
            },
            ..CompileContext::default()
        };

        let auth = callback_command(
            &Station::new(7, "Test"),
            &ctx,
            "auth",
            &[("dj_user", "user"), ("dj_password", "password")],
        );

        assert_eq!(
            auth,
            "curl -s --request POST --url http://web/api/internal/7/auth \
             --data-urlencode dj_user=#{string.quote(user)} \
             --data-urlencode dj_password=#{string.quote(password)} \
             --data-urlencode 'api_auth='"
        );
        assert!(!auth.contains("'#{"));
    }

    #[test]
    fn test_api_key_cannot_close_shell_quote() {
        let mut station = Station::new(7, "Test");
        station.adapter_api_key = Some("ab'; rm -rf /; '".to_string());
        let ctx = CompileContext {
            callback: CallbackConfig::Http {
                base_url: "http://web".to_string(),
            },
            ..CompileContext::default()
        };

        assert!(callback_command(&station, &ctx, "djon", &[])
            .ends_with("--data-urlencode 'api_auth=ab; rm -rf /; '"));
    }

    #[test]
    fn test_http_callback_command_carries_api_key() {
        let mut station = Station::new(7, "Test");
        station.adapter_api_key = Some("key".to_string());
        let ctx = CompileContext {
            callback: CallbackConfig::Http {
                base_url: "http://web/".to_string(),
            },
            ..CompileContext::default()
        };

        assert_eq!(
            callback_command(&station, &ctx, "djon", &[]),
            "curl -s --request POST --url http://web/api/internal/7/djon --data-urlencode 'api_auth=key'"
        );
    }

    #[test]
    fn test_output_clause_optional_fields() {
        let mut station = Station::new(1, "Test");
        station.url = Some("https://radio.example".to_string());
        let output = AutoDjOutput {
            format: AudioFormat::Opus,
            username: Some("source".to_string()),
            mount: Some("/radio.opus".to_string()),
            ..AutoDjOutput::default()
        };

        let clause = output_clause(&station, &output, "local_1", false);
        assert!(clause.starts_with("output.icecast(%opus(samplerate=48000, bitrate=128,"));
        assert!(clause.contains("id=\"test_local_1\""));
        assert!(clause.contains("user = \"source\""));
        assert!(clause.contains("mount = \"/radio.opus\""));
        assert!(clause.contains("url = \"https://radio.example\""));
        assert!(!clause.contains("protocol=\"icy\""));
        assert!(clause.ends_with(", radio)"));
    }

    #[test]
    fn test_output_clause_without_optional_fields() {
        let station = Station::new(1, "Test");
        let clause = output_clause(&station, &AutoDjOutput::default(), "relay_1", true);

        assert!(!clause.contains("user = "));
        assert!(!clause.contains("mount = "));
        assert!(!clause.contains("url = "));
        assert!(clause.contains("description = \"\""));
        assert!(clause.contains("protocol=\"icy\""));
    }
}
