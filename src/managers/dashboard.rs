//! The authenticated dashboard context.
//!
//! A `Dashboard` is mounted for the signed-in user: it seeds a reconciler from a
//! fresh snapshot, starts a change-feed listener, and handles the add/delete
//! actions. Actions never touch the list directly. The list changes through the
//! feed or through the re-render (`refresh`) that follows every successful action.

use std::sync::Arc;

use url::Url;

use crate::managers::bookmark_manager::BookmarkStore;
use crate::managers::reconciler::{Reconciler, SharedReconciler};
use crate::services::auth_service::AuthProvider;
use crate::services::change_feed::ChangeFeed;
use crate::services::display;
use crate::services::feed_listener::FeedListener;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::dashboard::{BookmarkRow, DashboardView};
use crate::types::errors::{ActionError, DashboardError, Field, ValidationError};
use crate::types::session::User;

/// Validates add-form input into a record ready for persistence.
///
/// Both fields must be non-blank and `url` must be an absolute URI.
pub fn validate_bookmark(url: &str, title: &str, user_id: &str) -> Result<NewBookmark, ValidationError> {
    let url = url.trim();
    let title = title.trim();

    if url.is_empty() {
        return Err(ValidationError::Required(Field::Url));
    }
    if title.is_empty() {
        return Err(ValidationError::Required(Field::Title));
    }
    Url::parse(url).map_err(|_| ValidationError::InvalidUrl)?;

    Ok(NewBookmark {
        url: url.to_string(),
        title: title.to_string(),
        user_id: user_id.to_string(),
    })
}

/// Marks a row pending for as long as it lives.
struct PendingDelete<'a> {
    reconciler: &'a SharedReconciler,
    id: &'a str,
}

impl<'a> PendingDelete<'a> {
    fn mark(reconciler: &'a SharedReconciler, id: &'a str) -> Self {
        reconciler.update(|r| {
            r.mark_pending(id);
            true
        });
        Self { reconciler, id }
    }
}

impl Drop for PendingDelete<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.reconciler.update(|r| {
            let was_pending = r.is_pending(id);
            r.clear_pending(id);
            was_pending
        });
    }
}

/// One mounted dashboard for one signed-in user.
pub struct Dashboard {
    user: User,
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn BookmarkStore>,
    reconciler: SharedReconciler,
    listener: Option<FeedListener>,
}

impl Dashboard {
    /// Mounts the dashboard for the current user.
    ///
    /// # Errors
    /// `Unauthenticated` when nobody is signed in, `Store` when the initial
    /// snapshot cannot be fetched.
    pub fn mount(
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn BookmarkStore>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Result<Self, DashboardError> {
        let user = auth.current_user().ok_or(DashboardError::Unauthenticated)?;

        let reconciler = SharedReconciler::new(Reconciler::new(user.id.clone()));
        let snapshot = store.select_all(&user.id)?;
        reconciler.update(|r| r.seed(snapshot));

        let listener = FeedListener::start(feed, auth.as_ref(), reconciler.clone());

        Ok(Self {
            user,
            auth,
            store,
            reconciler,
            listener,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// The reconciler behind this dashboard, for observing changes.
    pub fn reconciler(&self) -> &SharedReconciler {
        &self.reconciler
    }

    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.reconciler.snapshot()
    }

    pub fn is_live(&self) -> bool {
        self.reconciler.read(Reconciler::is_live)
    }

    /// Channel name of the live subscription, if one is open.
    pub fn feed_channel(&self) -> Option<&str> {
        self.listener.as_ref().and_then(FeedListener::channel)
    }

    /// Re-renders from a fresh snapshot. Returns whether the snapshot was applied.
    pub fn refresh(&self) -> Result<bool, DashboardError> {
        let snapshot = self.store.select_all(&self.user.id)?;
        Ok(self.reconciler.update(|r| r.seed(snapshot)))
    }

    /// The signed-in user, provided it is still the one this dashboard was mounted for.
    fn acting_user(&self) -> Result<User, ActionError> {
        match self.auth.current_user() {
            Some(user) if user.id == self.user.id => Ok(user),
            _ => Err(ActionError::Unauthenticated),
        }
    }

    /// Validates and persists a new bookmark.
    ///
    /// The new row is not inserted locally; it appears through the change feed or
    /// the refresh that follows a successful insert.
    pub fn request_add(&self, url: &str, title: &str) -> Result<(), ActionError> {
        let user = self.acting_user()?;
        let bookmark = validate_bookmark(url, title, &user.id)?;

        self.store.insert(&bookmark).map_err(|e| {
            log::warn!("adding bookmark for {} failed: {}", user.id, e);
            ActionError::from(e)
        })?;

        self.refresh_after_action();
        Ok(())
    }

    /// Deletes one of the user's bookmarks, marking its row pending meanwhile.
    pub fn request_delete(&self, id: &str) -> Result<(), ActionError> {
        let user = self.acting_user()?;

        {
            let _pending = PendingDelete::mark(&self.reconciler, id);
            self.store.delete(id, &user.id).map_err(|e| {
                log::warn!("deleting bookmark {} failed: {}", id, e);
                ActionError::from(e)
            })?;
        }

        self.refresh_after_action();
        Ok(())
    }

    fn refresh_after_action(&self) {
        if let Err(e) = self.refresh() {
            log::warn!("refresh after action failed: {}", e);
        }
    }

    /// Renders the dashboard.
    pub fn view(&self) -> DashboardView {
        self.reconciler.read(|r| {
            let rows: Vec<BookmarkRow> = r
                .bookmarks()
                .iter()
                .map(|b| BookmarkRow {
                    id: b.id.clone(),
                    title: b.title.clone(),
                    url: b.url.clone(),
                    domain: display::domain_of(&b.url),
                    favicon_url: display::favicon_url(&b.url),
                    created_label: display::format_created(&b.created_at),
                    pending: r.is_pending(&b.id),
                })
                .collect();

            DashboardView {
                email: self.user.email.clone(),
                empty_message: rows
                    .is_empty()
                    .then(|| display::EMPTY_LIST_MESSAGE.to_string()),
                rows,
                live: r.is_live(),
            }
        })
    }

    /// Tears down the live subscription.
    pub fn unmount(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.close();
        }
    }
}
