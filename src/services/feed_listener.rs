//! Change-feed listener for one mounted dashboard.
//!
//! Resolves the session, opens a uniquely named channel on the bookmark table with
//! the session's access token, and forwards decoded events into the shared
//! reconciler from a background task. The subscription is released exactly once,
//! on [`FeedListener::close`] or drop.
//!
//! A lost connection ends the forwarding task; there is no reconnection. Live
//! updates stop until the dashboard is mounted again.

use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::managers::reconciler::SharedReconciler;
use crate::services::auth_service::AuthProvider;
use crate::services::change_feed::{ChangeFeed, SubscriptionHandle};
use crate::types::errors::FeedError;
use crate::types::feed::{EventFilter, FeedEvent, BOOKMARKS_TABLE};

/// Owns one change-feed subscription and the task draining it.
pub struct FeedListener {
    feed: Arc<dyn ChangeFeed>,
    handle: Option<SubscriptionHandle>,
    task: Option<JoinHandle<()>>,
}

impl FeedListener {
    /// Subscribes on behalf of the current session.
    ///
    /// Returns `None` when there is no session or the subscription cannot be set
    /// up; the dashboard then keeps working from server snapshots alone.
    pub fn start(
        feed: Arc<dyn ChangeFeed>,
        auth: &dyn AuthProvider,
        reconciler: SharedReconciler,
    ) -> Option<Self> {
        let Some(session) = auth.session() else {
            log::info!("no session found; live bookmark updates disabled");
            return None;
        };

        let channel = format!("{}-{}", BOOKMARKS_TABLE, Uuid::new_v4());
        let subscription = match feed.subscribe(
            &channel,
            BOOKMARKS_TABLE,
            EventFilter::All,
            &session.access_token,
        ) {
            Ok(subscription) => subscription,
            Err(e) => {
                log::warn!("change feed subscription failed: {}", e);
                return None;
            }
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let err = FeedError::Unavailable(e.to_string());
                log::warn!("cannot drive change feed {}: {}", channel, err);
                feed.unsubscribe(&subscription.handle);
                return None;
            }
        };

        let task = runtime.spawn(forward_events(
            subscription.events,
            reconciler,
            channel.clone(),
        ));
        log::info!("subscribed to {} for user {}", channel, session.user.id);

        Some(Self {
            feed,
            handle: Some(subscription.handle),
            task: Some(task),
        })
    }

    /// Name of the subscribed channel, until the listener is released.
    pub fn channel(&self) -> Option<&str> {
        self.handle.as_ref().map(SubscriptionHandle::channel)
    }

    /// Whether events are still being forwarded.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Tears the subscription down.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(handle) = self.handle.take() {
            self.feed.unsubscribe(&handle);
            log::info!("released change feed {}", handle.channel());
        }
    }
}

impl Drop for FeedListener {
    fn drop(&mut self) {
        self.release();
    }
}

async fn forward_events(
    mut events: mpsc::UnboundedReceiver<Value>,
    reconciler: SharedReconciler,
    channel: String,
) {
    while let Some(payload) = events.recv().await {
        match FeedEvent::decode(&payload) {
            FeedEvent::Unknown => {
                log::debug!("ignoring unrecognised payload on {}", channel);
            }
            event => {
                reconciler.update(|r| r.apply(event));
            }
        }
    }
    log::info!("change feed {} closed; live updates stopped", channel);
}
