use serde::Serialize;

/// One rendered row of the bookmark list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub favicon_url: String,
    pub created_label: String,
    /// A delete for this row is in flight; its delete control is disabled.
    pub pending: bool,
}

/// Everything the authenticated dashboard page displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub email: String,
    pub rows: Vec<BookmarkRow>,
    /// Shown instead of the list when there are no rows.
    pub empty_message: Option<String>,
    /// Whether the change feed has taken over from server snapshots.
    pub live: bool,
}

/// Result of routing a page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum Page {
    /// Unauthenticated sign-in entry point.
    Landing,
    /// Authenticated bookmark dashboard.
    Dashboard { email: String },
    Redirect { to: String },
    NotFound,
}
