//! SQLite station store

pub mod init;
pub mod store;

pub use init::*;
pub use store::{hash_password, SqliteStore};
