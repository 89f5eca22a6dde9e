//! Unit tests for the in-process `ChangeFeedHub`: token scoping, per-user
//! delivery, filters and channel lifecycle.

use chrono::{TimeZone, Utc};
use smartmarks::services::auth_service::TokenRegistry;
use smartmarks::services::change_feed::{ChangeFeed, ChangeFeedHub, SubscriptionHandle};
use smartmarks::types::bookmark::Bookmark;
use smartmarks::types::errors::FeedError;
use smartmarks::types::feed::{ChangeRecord, EventFilter, FeedEvent};
use smartmarks::types::session::AccessToken;

fn setup() -> (ChangeFeedHub, AccessToken, AccessToken) {
    let tokens = TokenRegistry::new();
    let alice = AccessToken::new("alice-token".to_string());
    let bob = AccessToken::new("bob-token".to_string());
    tokens.register(&alice, "alice");
    tokens.register(&bob, "bob");
    (ChangeFeedHub::new(tokens), alice, bob)
}

fn bookmark(id: &str, owner: &str) -> Bookmark {
    Bookmark {
        id: id.to_string(),
        url: "https://a.com".to_string(),
        title: "A".to_string(),
        created_at: Utc.with_ymd_and_hms(2026, 10, 16, 0, 0, 0).unwrap(),
        user_id: owner.to_string(),
    }
}

#[test]
fn test_unknown_token_is_rejected() {
    let (hub, _, _) = setup();
    let stranger = AccessToken::new("forged".to_string());
    let err = hub
        .subscribe("bookmarks-1", "bookmarks", EventFilter::All, &stranger)
        .unwrap_err();
    assert_eq!(err, FeedError::Unauthorized);
    assert_eq!(hub.channel_count(), 0);
}

#[test]
fn test_channel_names_must_be_unique() {
    let (hub, alice, bob) = setup();
    let _first = hub.subscribe("bookmarks-1", "bookmarks", EventFilter::All, &alice).unwrap();
    let err = hub
        .subscribe("bookmarks-1", "bookmarks", EventFilter::All, &bob)
        .unwrap_err();
    assert_eq!(err, FeedError::ChannelInUse("bookmarks-1".to_string()));
}

#[test]
fn test_rows_are_delivered_only_to_their_owner() {
    let (hub, alice, bob) = setup();
    let mut alice_sub = hub.subscribe("a", "bookmarks", EventFilter::All, &alice).unwrap();
    let mut bob_sub = hub.subscribe("b", "bookmarks", EventFilter::All, &bob).unwrap();

    let delivered = hub.publish(&ChangeRecord::insert(&bookmark("b1", "alice")));
    assert_eq!(delivered, 1);

    let payload = alice_sub.events.try_recv().unwrap();
    assert_eq!(FeedEvent::decode(&payload), FeedEvent::Insert(bookmark("b1", "alice")));
    assert!(bob_sub.events.try_recv().is_err());
}

#[test]
fn test_filters_and_tables_are_respected() {
    let (hub, alice, _) = setup();
    let mut inserts = hub.subscribe("ins", "bookmarks", EventFilter::Insert, &alice).unwrap();
    let mut deletes = hub.subscribe("del", "bookmarks", EventFilter::Delete, &alice).unwrap();
    let mut other = hub.subscribe("other", "notes", EventFilter::All, &alice).unwrap();

    hub.publish(&ChangeRecord::insert(&bookmark("b1", "alice")));
    hub.publish(&ChangeRecord::delete("b1", "alice"));

    assert!(matches!(FeedEvent::decode(&inserts.events.try_recv().unwrap()), FeedEvent::Insert(_)));
    assert!(inserts.events.try_recv().is_err());
    assert_eq!(
        FeedEvent::decode(&deletes.events.try_recv().unwrap()),
        FeedEvent::Delete("b1".to_string())
    );
    assert!(deletes.events.try_recv().is_err());
    assert!(other.events.try_recv().is_err());
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let (hub, alice, _) = setup();
    let sub = hub.subscribe("a", "bookmarks", EventFilter::All, &alice).unwrap();
    assert_eq!(hub.channel_count(), 1);

    hub.unsubscribe(&sub.handle);
    hub.unsubscribe(&sub.handle);
    hub.unsubscribe(&SubscriptionHandle::new("never-opened"));
    assert_eq!(hub.channel_count(), 0);
}

#[test]
fn test_dropped_receivers_are_pruned_on_publish() {
    let (hub, alice, _) = setup();
    let sub = hub.subscribe("a", "bookmarks", EventFilter::All, &alice).unwrap();
    drop(sub);

    assert_eq!(hub.publish(&ChangeRecord::insert(&bookmark("b1", "alice"))), 0);
    assert_eq!(hub.channel_count(), 0);
}

#[tokio::test]
async fn test_disconnect_all_ends_streams() {
    let (hub, alice, bob) = setup();
    let mut a = hub.subscribe("a", "bookmarks", EventFilter::All, &alice).unwrap();
    let mut b = hub.subscribe("b", "bookmarks", EventFilter::All, &bob).unwrap();

    hub.disconnect_all();

    assert_eq!(hub.channel_count(), 0);
    assert!(a.events.recv().await.is_none());
    assert!(b.events.recv().await.is_none());
}
