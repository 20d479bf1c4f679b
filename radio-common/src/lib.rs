//! # Radio Common Library
//!
//! Shared code for the station broadcast backend:
//! - Station, playlist, mount, remote and streamer models
//! - Repository contracts for the external station store
//! - SQLite implementation of those contracts
//! - Bootstrap configuration loading
//! - Station directory layout and media path resolution

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod filesystem;
pub mod models;
pub mod repository;

pub use error::{Error, Result};
pub use filesystem::StationFilesystem;
pub use repository::{NextSongProvider, StationRepository};
