use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved bookmark as stored by the persistence layer and carried by the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

/// A bookmark that has passed validation but has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    pub user_id: String,
}
