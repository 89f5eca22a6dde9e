//! Change-feed transport.
//!
//! [`ChangeFeed`] is the subscribe/unsubscribe seam the listener depends on.
//! [`ChangeFeedHub`] is the in-process implementation: the bookmark store publishes
//! a [`ChangeRecord`] after every write and the hub fans the JSON payload out to
//! every authenticated channel that owns the row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::services::auth_service::TokenRegistry;
use crate::types::errors::FeedError;
use crate::types::feed::{ChangeRecord, EventFilter};
use crate::types::session::AccessToken;

/// Identifies one open subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    channel: String,
}

impl SubscriptionHandle {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// An open subscription: its handle and the stream of raw payloads.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub events: mpsc::UnboundedReceiver<Value>,
}

/// Trait defining the change-feed collaborator.
pub trait ChangeFeed: Send + Sync {
    /// Opens a channel for `table` delivering the kinds selected by `filter`,
    /// scoped to the user the token was issued to.
    fn subscribe(
        &self,
        channel: &str,
        table: &str,
        filter: EventFilter,
        token: &AccessToken,
    ) -> Result<Subscription, FeedError>;

    /// Closes a channel. Unknown handles are ignored.
    fn unsubscribe(&self, handle: &SubscriptionHandle);
}

struct Channel {
    table: String,
    filter: EventFilter,
    user_id: String,
    sender: mpsc::UnboundedSender<Value>,
}

/// In-process change feed shared between the store (publisher) and listeners.
#[derive(Clone)]
pub struct ChangeFeedHub {
    tokens: TokenRegistry,
    channels: Arc<Mutex<HashMap<String, Channel>>>,
}

impl ChangeFeedHub {
    pub fn new(tokens: TokenRegistry) -> Self {
        Self {
            tokens,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Delivers a row change to every matching channel. Returns the number of
    /// channels it was delivered to.
    pub fn publish(&self, record: &ChangeRecord) -> usize {
        let payload = record.to_payload();
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;

        channels.retain(|name, channel| {
            if channel.table != record.table
                || !channel.filter.matches(record.kind)
                || channel.user_id != record.owner_id
            {
                return true;
            }
            if channel.sender.send(payload.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                log::debug!("pruning closed channel {}", name);
                false
            }
        });

        log::trace!(
            "published {} on {} to {} channel(s)",
            record.kind.as_str(),
            record.table,
            delivered
        );
        delivered
    }

    /// Number of open channels.
    pub fn channel_count(&self) -> usize {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drops every channel, as a lost connection would. Listeners see their
    /// stream end and are not resubscribed.
    pub fn disconnect_all(&self) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        log::info!("disconnecting {} change-feed channel(s)", channels.len());
        channels.clear();
    }
}

impl ChangeFeed for ChangeFeedHub {
    fn subscribe(
        &self,
        channel: &str,
        table: &str,
        filter: EventFilter,
        token: &AccessToken,
    ) -> Result<Subscription, FeedError> {
        let user_id = self.tokens.resolve(token).ok_or(FeedError::Unauthorized)?;

        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if channels.contains_key(channel) {
            return Err(FeedError::ChannelInUse(channel.to_string()));
        }

        let (sender, events) = mpsc::unbounded_channel();
        channels.insert(
            channel.to_string(),
            Channel {
                table: table.to_string(),
                filter,
                user_id,
                sender,
            },
        );

        Ok(Subscription {
            handle: SubscriptionHandle::new(channel),
            events,
        })
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let removed = self
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(handle.channel());
        if removed.is_some() {
            log::debug!("closed channel {}", handle.channel());
        }
    }
}
