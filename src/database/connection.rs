//! SQLite database connection management for Smartmarks.
//!
//! Provides the [`Database`] struct that wraps a `rusqlite::Connection`
//! and brings the schema up to date on open.

use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Owns the SQLite connection shared by the bookmark store and local auth.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) a SQLite database at the given file path and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// The data is discarded when the `Database` is dropped.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        log::debug!(
            "database ready at schema version {}",
            migrations::get_schema_version(&conn)
        );
        Ok(Self { conn })
    }

    /// Returns a reference to the underlying `rusqlite::Connection`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
