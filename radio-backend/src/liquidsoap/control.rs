//! Telnet control-socket client
//!
//! One connection per command: connect, write the command followed by `quit`,
//! then read until the engine closes the socket. There is no pooling and no
//! retry; a failed session surfaces as `ControlUnavailable`.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Undo the escaping commands pick up on their way through web forms and shells
pub fn unescape_command(command: &str) -> String {
    let decoded = urlencoding::decode(command)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| command.to_string());

    decoded.replace("\\'", "'").replace("&amp;", "&")
}

/// Unescape a command and make sure it is still a single line
pub fn command_line(command: &str) -> Result<String> {
    let line = unescape_command(command);
    if line.contains(['\n', '\r']) {
        return Err(Error::InvalidCommand(line.escape_debug().to_string()));
    }
    Ok(line)
}

#[derive(Debug, Clone)]
pub struct ControlClient {
    host: String,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl ControlClient {
    pub fn new(host: impl Into<String>, connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            connect_timeout,
            command_timeout,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Run one command and return the engine's response lines, trimmed
    pub async fn send(&self, port: u16, command: &str) -> Result<Vec<String>> {
        let line = command_line(command)?;
        let address = format!("{}:{}", self.host, port);
        debug!(%address, command, "Sending control command");

        let stream = match timeout(self.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(%address, "Control socket connect failed: {}", e);
                return Err(Error::ControlUnavailable(format!("{}: {}", address, e)));
            }
            Err(_) => {
                warn!(%address, "Control socket connect timed out");
                return Err(Error::ControlUnavailable(format!(
                    "{}: connect timed out after {:?}",
                    address, self.connect_timeout
                )));
            }
        };

        let payload = format!("{}\nquit\n", line);

        match timeout(self.command_timeout, Self::session(stream, payload)).await {
            Ok(Ok(lines)) => Ok(lines),
            Ok(Err(e)) => Err(Error::ControlUnavailable(format!("{}: {}", address, e))),
            Err(_) => Err(Error::ControlUnavailable(format!(
                "{}: no response within {:?}",
                address, self.command_timeout
            ))),
        }
    }

    async fn session(mut stream: TcpStream, payload: String) -> std::io::Result<Vec<String>> {
        stream.write_all(payload.as_bytes()).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream).split(b'\n');
        let mut lines = Vec::new();
        while let Some(segment) = reader.next_segment().await? {
            lines.push(String::from_utf8_lossy(&segment).trim().to_string());
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_command() {
        assert_eq!(unescape_command("radio.push%20a%26b.mp3"), "radio.push a&b.mp3");
        assert_eq!(unescape_command("say \\'hi\\' &amp; bye"), "say 'hi' & bye");
    }

    #[test]
    fn test_command_line_rejects_encoded_line_breaks() {
        assert!(matches!(
            command_line("radio.push /a.mp3%0Aradio_input_streamer.stop"),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(command_line("radio.push /a.mp3%0D"), Err(Error::InvalidCommand(_))));
        assert_eq!(command_line("radio.push%20/a.mp3").unwrap(), "radio.push /a.mp3");
    }

    #[test]
    fn test_unescape_keeps_invalid_encoding() {
        assert_eq!(unescape_command("100%ff"), "100%ff");
    }
}
