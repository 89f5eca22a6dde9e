//! Bookmark list reconciliation for one signed-in user.
//!
//! Merges three update sources into one ordered list: snapshots fetched by the
//! server render (`seed`), and insert/delete events from the change feed. Once the
//! feed has produced an event, it is authoritative for the rest of the session and
//! later snapshots are ignored, so a slow re-render cannot clobber newer live state.
//!
//! Invariants held after every operation:
//! - ids are unique;
//! - rows are ordered by `created_at` descending, later arrivals first on ties;
//! - every row is owned by the session user.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::types::bookmark::Bookmark;
use crate::types::feed::FeedEvent;

/// In-memory bookmark list shown on one dashboard.
#[derive(Debug, Clone)]
pub struct Reconciler {
    user_id: String,
    bookmarks: Vec<Bookmark>,
    live_takeover: bool,
    pending: HashSet<String>,
}

impl Reconciler {
    /// Creates an empty reconciler for the given session user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            bookmarks: Vec::new(),
            live_takeover: false,
            pending: HashSet::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The current ordered list.
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    /// Whether the change feed has taken over from server snapshots.
    pub fn is_live(&self) -> bool {
        self.live_takeover
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bookmarks.iter().any(|b| b.id == id)
    }

    /// Replaces the list with a server snapshot, unless the feed has taken over.
    ///
    /// Rows owned by another user and repeated ids are dropped. Returns `true`
    /// when the snapshot was applied.
    pub fn seed(&mut self, snapshot: Vec<Bookmark>) -> bool {
        if self.live_takeover {
            log::debug!(
                "ignoring snapshot of {} rows for user {}: live feed has taken over",
                snapshot.len(),
                self.user_id
            );
            return false;
        }

        let mut seen = HashSet::with_capacity(snapshot.len());
        let mut rows = Vec::with_capacity(snapshot.len());
        for bookmark in snapshot {
            if bookmark.user_id != self.user_id {
                log::warn!(
                    "dropping snapshot row {} owned by another user",
                    bookmark.id
                );
                continue;
            }
            if seen.insert(bookmark.id.clone()) {
                rows.push(bookmark);
            }
        }
        // Stable: ties keep the snapshot's own order.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.bookmarks = rows;
        true
    }

    /// Applies an insert event from the change feed.
    ///
    /// Rows owned by another user are ignored without taking over. Returns `true`
    /// when the list changed.
    pub fn apply_insert(&mut self, bookmark: Bookmark) -> bool {
        if bookmark.user_id != self.user_id {
            log::debug!("ignoring feed insert {} for another user", bookmark.id);
            return false;
        }
        self.live_takeover = true;

        if self.contains(&bookmark.id) {
            return false;
        }
        let at = self
            .bookmarks
            .iter()
            .position(|b| b.created_at <= bookmark.created_at)
            .unwrap_or(self.bookmarks.len());
        self.bookmarks.insert(at, bookmark);
        true
    }

    /// Applies a delete event from the change feed. Returns `true` when a row was removed.
    pub fn apply_delete(&mut self, id: &str) -> bool {
        self.live_takeover = true;
        self.pending.remove(id);

        match self.bookmarks.iter().position(|b| b.id == id) {
            Some(index) => {
                self.bookmarks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Applies a decoded feed event; `Unknown` events are dropped.
    pub fn apply(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Insert(bookmark) => self.apply_insert(bookmark),
            FeedEvent::Delete(id) => self.apply_delete(&id),
            FeedEvent::Unknown => false,
        }
    }

    /// Marks a row as having a delete in flight.
    pub fn mark_pending(&mut self, id: &str) {
        self.pending.insert(id.to_string());
    }

    pub fn clear_pending(&mut self, id: &str) {
        self.pending.remove(id);
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }
}

/// A reconciler shared between the dashboard and its feed listener.
///
/// Every mutation runs under one lock, so `seed`, `apply_insert` and
/// `apply_delete` never interleave. Each change bumps a version counter that
/// observers can await.
#[derive(Debug, Clone)]
pub struct SharedReconciler {
    inner: Arc<Mutex<Reconciler>>,
    version: Arc<watch::Sender<u64>>,
}

impl SharedReconciler {
    pub fn new(reconciler: Reconciler) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(reconciler)),
            version: Arc::new(version),
        }
    }

    /// Runs a read-only closure against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&Reconciler) -> R) -> R {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Runs a mutation; when it reports a change the version is bumped.
    pub fn update(&self, f: impl FnOnce(&mut Reconciler) -> bool) -> bool {
        let changed = {
            let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut guard)
        };
        if changed {
            self.version.send_modify(|v| *v += 1);
        }
        changed
    }

    /// Receiver that observes every change made through [`SharedReconciler::update`].
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// A copy of the current list.
    pub fn snapshot(&self) -> Vec<Bookmark> {
        self.read(|r| r.bookmarks().to_vec())
    }
}
