//! Change-feed payloads and their typed decoding.
//!
//! The feed delivers untyped JSON rows tagged with an `eventType`. They are decoded
//! exactly once, at the listener boundary, into [`FeedEvent`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::bookmark::Bookmark;

/// Table name of the bookmark collection on the change feed.
pub const BOOKMARKS_TABLE: &str = "bookmarks";

/// Kind of row change carried by a feed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// Which change kinds a subscription wants delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    Insert,
    Delete,
}

impl EventFilter {
    pub fn matches(&self, kind: ChangeKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Insert => kind == ChangeKind::Insert,
            EventFilter::Delete => kind == ChangeKind::Delete,
        }
    }
}

/// A row change as emitted by the persistence layer's replication stream.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub table: String,
    pub kind: ChangeKind,
    /// Owner of the affected row; used to scope delivery per user.
    pub owner_id: String,
    /// Full row for inserts, `None` for deletes.
    pub new: Option<Value>,
    /// Primary key of the removed row for deletes, `None` for inserts.
    pub old_id: Option<String>,
}

impl ChangeRecord {
    pub fn insert(bookmark: &Bookmark) -> Self {
        Self {
            table: BOOKMARKS_TABLE.to_string(),
            kind: ChangeKind::Insert,
            owner_id: bookmark.user_id.clone(),
            new: serde_json::to_value(bookmark).ok(),
            old_id: None,
        }
    }

    pub fn delete(id: &str, owner_id: &str) -> Self {
        Self {
            table: BOOKMARKS_TABLE.to_string(),
            kind: ChangeKind::Delete,
            owner_id: owner_id.to_string(),
            new: None,
            old_id: Some(id.to_string()),
        }
    }

    /// Renders the wire payload delivered to subscribers.
    pub fn to_payload(&self) -> Value {
        let old = match &self.old_id {
            Some(id) => json!({ "id": id }),
            None => json!({}),
        };
        json!({
            "eventType": self.kind.as_str(),
            "schema": "public",
            "table": self.table,
            "new": self.new.clone().unwrap_or_else(|| json!({})),
            "old": old,
        })
    }
}

/// A decoded change-feed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Insert(Bookmark),
    Delete(String),
    /// Unrecognised kind or a payload that does not have the expected shape.
    Unknown,
}

impl FeedEvent {
    /// Decodes a raw payload by its `eventType` tag.
    pub fn decode(payload: &Value) -> Self {
        match payload.get("eventType").and_then(Value::as_str) {
            Some("INSERT") => payload
                .get("new")
                .cloned()
                .and_then(|row| serde_json::from_value::<Bookmark>(row).ok())
                .map_or(FeedEvent::Unknown, FeedEvent::Insert),
            Some("DELETE") => payload
                .get("old")
                .and_then(|old| old.get("id"))
                .and_then(Value::as_str)
                .map_or(FeedEvent::Unknown, |id| FeedEvent::Delete(id.to_string())),
            _ => FeedEvent::Unknown,
        }
    }
}
