//! Error types for radio-backend
//!
//! None of these are retried internally; callers decide what to do with them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown or unavailable adapter, station, streamer or media
    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine's control socket could not be reached or timed out
    #[error("Control socket unavailable: {0}")]
    ControlUnavailable(String),

    /// The manual request queue still holds a pending track
    #[error("Song(s) still pending in request queue")]
    RequestQueueBusy,

    /// A control command would span more than one line once unescaped
    #[error("Invalid control command: {0}")]
    InvalidCommand(String),

    /// Station data could not be turned into a complete engine program
    #[error("Compile error: {0}")]
    Compile(String),

    /// Operation not supported by the selected adapter
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Station store or configuration failure
    #[error(transparent)]
    Common(radio_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<radio_common::Error> for Error {
    fn from(err: radio_common::Error) -> Self {
        match err {
            radio_common::Error::NotFound(what) => Error::NotFound(what),
            other => Error::Common(other),
        }
    }
}

/// Convenience Result type using the radio-backend Error
pub type Result<T> = std::result::Result<T, Error>;
