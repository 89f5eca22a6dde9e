//! Presentation helpers for dashboard rows.

use chrono::{DateTime, Utc};
use url::Url;

/// Shown in place of the list when the user has no bookmarks.
pub const EMPTY_LIST_MESSAGE: &str = "No bookmarks yet. Add your first one above.";

/// Host of `url` without a leading `www.`; the input itself if it does not parse.
pub fn domain_of(url: &str) -> String {
    match Url::parse(url).ok().as_ref().and_then(Url::host_str) {
        Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
        None => url.to_string(),
    }
}

/// Favicon service URL for the bookmark's domain.
pub fn favicon_url(url: &str) -> String {
    format!(
        "https://www.google.com/s2/favicons?domain={}&sz=32",
        domain_of(url)
    )
}

/// Short date label, e.g. `Oct 16, 2026`.
pub fn format_created(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %Y").to_string()
}
