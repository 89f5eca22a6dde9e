//! Bookmark persistence for Smartmarks.
//!
//! Implements `BookmarkStore` (insert, owner-scoped delete and newest-first
//! listing) backed by SQLite via `rusqlite`. After each successful write the
//! change is published to the attached change-feed hub, the way a hosted database
//! streams its replication log.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use uuid::Uuid;

use crate::database::connection::Database;
use crate::services::change_feed::ChangeFeedHub;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StoreError;
use crate::types::feed::ChangeRecord;

/// Trait defining the persistence collaborator.
pub trait BookmarkStore {
    /// Persists a validated bookmark and returns the stored row.
    fn insert(&self, bookmark: &NewBookmark) -> Result<Bookmark, StoreError>;
    /// Deletes `id` only if it is owned by `owner_id`. Returns the number of rows removed.
    fn delete(&self, id: &str, owner_id: &str) -> Result<usize, StoreError>;
    /// All bookmarks of `owner_id`, newest first.
    fn select_all(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError>;
}

/// Bookmark store backed by the shared SQLite database.
pub struct BookmarkManager {
    db: Arc<Database>,
    feed: Option<ChangeFeedHub>,
}

impl BookmarkManager {
    /// Creates a store that does not publish changes.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db, feed: None }
    }

    /// Creates a store that publishes every write to `feed`.
    pub fn with_feed(db: Arc<Database>, feed: ChangeFeedHub) -> Self {
        Self {
            db,
            feed: Some(feed),
        }
    }

    fn publish(&self, record: ChangeRecord) {
        if let Some(feed) = &self.feed {
            feed.publish(&record);
        }
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        let created_at: String = row.get(3)?;
        Ok(Bookmark {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            created_at: parse_timestamp(&created_at)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
            user_id: row.get(4)?,
        })
    }
}

/// Fixed-width RFC 3339 (microseconds, `Z` suffix); text order equals time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|ts| ts.with_timezone(&Utc))
}

impl BookmarkStore for BookmarkManager {
    fn insert(&self, bookmark: &NewBookmark) -> Result<Bookmark, StoreError> {
        let stored = Bookmark {
            id: Uuid::new_v4().to_string(),
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            created_at: Utc::now().trunc_subsecs(6),
            user_id: bookmark.user_id.clone(),
        };

        self.db.connection().execute(
            "INSERT INTO bookmarks (id, url, title, created_at, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                stored.id,
                stored.url,
                stored.title,
                format_timestamp(&stored.created_at),
                stored.user_id
            ],
        )?;

        self.publish(ChangeRecord::insert(&stored));
        Ok(stored)
    }

    /// A delete that matches no owned row is not an error and publishes nothing.
    fn delete(&self, id: &str, owner_id: &str) -> Result<usize, StoreError> {
        let affected = self.db.connection().execute(
            "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
            params![id, owner_id],
        )?;

        if affected > 0 {
            self.publish(ChangeRecord::delete(id, owner_id));
        } else {
            log::debug!("delete of {} by {} matched no rows", id, owner_id);
        }
        Ok(affected)
    }

    fn select_all(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, url, title, created_at, user_id FROM bookmarks \
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![owner_id], Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
