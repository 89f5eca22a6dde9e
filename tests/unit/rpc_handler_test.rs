//! Unit tests for the RPC handler: every JSON-RPC method dispatched by `handle_method`.
//!
//! These tests go through the same code path as the `smartmarks-rpc` binary,
//! using a temporary on-disk SQLite database.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use smartmarks::app::App;
use smartmarks::rpc_handler::handle_method;
use smartmarks::types::dashboard::Page;

/// Create a fresh App backed by a temp directory DB.
fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let db_path = tmp.path().join("test.db");
    let app = App::new(db_path.to_str().unwrap()).expect("Failed to init App");
    (Mutex::new(app), tmp)
}

fn call(app: &Mutex<App>, method: &str, params: Value) -> Value {
    handle_method(app, method, &params).unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

/// Signs in and opens a dashboard, returning its id.
fn open_dashboard(app: &Mutex<App>) -> String {
    let res = call(app, "dashboard.open", json!({}));
    res["dashboard_id"].as_str().expect("dashboard id").to_string()
}

fn signed_in() -> (Mutex<App>, TempDir, String) {
    let (app, tmp) = setup();
    call(&app, "auth.signIn", json!({"email": "reader@example.com"}));
    let dashboard = open_dashboard(&app);
    (app, tmp, dashboard)
}

fn titles(view: &Value) -> Vec<String> {
    view["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap().to_string())
        .collect()
}

// ─── Ping / unknown ───

#[test]
fn test_ping() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "ping", json!({})), json!({"pong": true}));
}

#[test]
fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "nonexistent.method", &json!({})).unwrap_err();
    assert_eq!(err, "unknown method: nonexistent.method");
}

// ─── Auth ───

#[test]
fn test_sign_in_and_current_user() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "auth.user", json!({})), json!({"user": null}));

    let res = call(&app, "auth.signIn", json!({"email": "Reader@Example.com"}));
    assert_eq!(res["user"]["email"], "reader@example.com");

    let current = call(&app, "auth.user", json!({}));
    assert_eq!(current["user"], res["user"]);
}

#[test]
fn test_sign_in_rejects_bad_email() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "auth.signIn", &json!({"email": "nope"})).unwrap_err();
    assert!(err.contains("Invalid email address"));
    assert!(handle_method(&app, "auth.signIn", &json!({})).is_err());
}

#[test]
fn test_sign_out_redirects_and_closes_dashboards() {
    let (app, _tmp, dashboard) = signed_in();

    assert_eq!(call(&app, "auth.signOut", json!({})), json!({"redirect": "/"}));
    assert_eq!(app.lock().unwrap().dashboard_count(), 0);

    let err = handle_method(&app, "dashboard.view", &json!({"dashboard_id": dashboard})).unwrap_err();
    assert_eq!(err, format!("unknown dashboard: {}", dashboard));
}

#[test]
fn test_rejected_sign_in_keeps_session_and_dashboards() {
    let (app, _tmp, dashboard) = signed_in();

    let err = handle_method(&app, "auth.signIn", &json!({"email": "not-an-email"})).unwrap_err();
    assert!(err.contains("Invalid email address"));

    assert_eq!(
        call(&app, "page.route", json!({"path": "/dashboard"})),
        json!({"page": "dashboard", "email": "reader@example.com"})
    );
    let view = call(&app, "dashboard.view", json!({"dashboard_id": dashboard}));
    assert_eq!(view["email"], "reader@example.com");
}

#[tokio::test]
async fn test_rejected_sign_in_keeps_feed_channels_open() {
    let (app, _tmp, _dashboard) = signed_in();
    assert_eq!(app.lock().unwrap().feed.channel_count(), 1);

    assert!(handle_method(&app, "auth.signIn", &json!({"email": "  "})).is_err());
    let app = app.lock().unwrap();
    assert_eq!(app.dashboard_count(), 1);
    assert_eq!(app.feed.channel_count(), 1);
}

#[test]
fn test_second_sign_in_replaces_dashboards() {
    let (app, _tmp, dashboard) = signed_in();
    call(&app, "auth.signIn", json!({"email": "other@example.com"}));

    assert_eq!(app.lock().unwrap().dashboard_count(), 0);
    assert!(handle_method(&app, "dashboard.view", &json!({"dashboard_id": dashboard})).is_err());
}

#[tokio::test]
async fn test_shutdown_signs_out_and_releases_channels() {
    let (app, _tmp, _dashboard) = signed_in();
    let mut app = app.into_inner().unwrap();
    assert_eq!(app.feed.channel_count(), 1);

    app.shutdown();
    assert_eq!(app.dashboard_count(), 0);
    assert_eq!(app.feed.channel_count(), 0);
    assert_eq!(app.route("/dashboard"), Page::Redirect { to: "/".to_string() });
}

// ─── Pages ───

#[test]
fn test_page_routing_follows_session() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "page.route", json!({"path": "/"})), json!({"page": "landing"}));
    assert_eq!(
        call(&app, "page.route", json!({"path": "/dashboard"})),
        json!({"page": "redirect", "to": "/"})
    );

    call(&app, "auth.signIn", json!({"email": "reader@example.com"}));
    assert_eq!(
        call(&app, "page.route", json!({"path": "/"})),
        json!({"page": "redirect", "to": "/dashboard"})
    );
    assert_eq!(
        call(&app, "page.route", json!({"path": "/dashboard"})),
        json!({"page": "dashboard", "email": "reader@example.com"})
    );
    assert_eq!(call(&app, "page.route", json!({"path": "/admin"})), json!({"page": "not_found"}));
}

// ─── Dashboard ───

#[test]
fn test_dashboard_open_requires_session() {
    let (app, _tmp) = setup();
    assert_eq!(call(&app, "dashboard.open", json!({})), json!({"redirect": "/"}));
}

#[test]
fn test_dashboard_open_returns_empty_view() {
    let (app, _tmp) = setup();
    call(&app, "auth.signIn", json!({"email": "reader@example.com"}));

    let res = call(&app, "dashboard.open", json!({}));
    assert!(res["dashboard_id"].is_string());
    assert_eq!(res["view"]["email"], "reader@example.com");
    assert_eq!(res["view"]["rows"], json!([]));
    assert!(res["view"]["empty_message"].is_string());
}

#[test]
fn test_dashboard_close() {
    let (app, _tmp, dashboard) = signed_in();
    assert_eq!(call(&app, "dashboard.close", json!({"dashboard_id": dashboard})), json!({"ok": true}));
    assert_eq!(call(&app, "dashboard.close", json!({"dashboard_id": dashboard})), json!({"ok": false}));
}

#[test]
fn test_dashboard_refresh_reports_view() {
    let (app, _tmp, dashboard) = signed_in();
    let res = call(&app, "dashboard.refresh", json!({"dashboard_id": dashboard}));
    assert_eq!(res["applied"], true);
    assert_eq!(res["view"]["rows"], json!([]));
}

#[test]
fn test_unknown_dashboard_is_an_error() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "dashboard.view", &json!({"dashboard_id": "missing"})).unwrap_err();
    assert_eq!(err, "unknown dashboard: missing");
    assert!(handle_method(&app, "dashboard.view", &json!({})).is_err());
}

// ─── Bookmarks ───

#[test]
fn test_bookmark_add_and_view() {
    let (app, _tmp, dashboard) = signed_in();

    let res = call(
        &app,
        "bookmark.add",
        json!({"dashboard_id": dashboard, "url": "https://www.rust-lang.org", "title": "Rust"}),
    );
    assert_eq!(res, json!({"success": true}));

    let view = call(&app, "dashboard.view", json!({"dashboard_id": dashboard}));
    assert_eq!(titles(&view), vec!["Rust"]);
    assert_eq!(view["rows"][0]["domain"], "rust-lang.org");
    assert_eq!(view["empty_message"], Value::Null);
}

#[test]
fn test_bookmark_add_validation_errors() {
    let (app, _tmp, dashboard) = signed_in();

    let missing = call(&app, "bookmark.add", json!({"dashboard_id": dashboard, "url": "https://x.com"}));
    assert_eq!(missing, json!({"error": "Both fields are required", "field": "title"}));

    let invalid = call(
        &app,
        "bookmark.add",
        json!({"dashboard_id": dashboard, "url": "not a url", "title": "Bad"}),
    );
    assert_eq!(invalid, json!({"error": "Please enter a valid URL", "field": "url"}));

    let view = call(&app, "dashboard.view", json!({"dashboard_id": dashboard}));
    assert_eq!(view["rows"], json!([]));
}

#[test]
fn test_bookmark_add_after_sign_out_redirects() {
    let (app, _tmp, dashboard) = signed_in();
    call(&app, "auth.signOut", json!({}));

    let err = handle_method(
        &app,
        "bookmark.add",
        &json!({"dashboard_id": dashboard, "url": "https://x.com", "title": "X"}),
    )
    .unwrap_err();
    assert!(err.starts_with("unknown dashboard"));
}

#[test]
fn test_bookmark_delete() {
    let (app, _tmp, dashboard) = signed_in();
    for (url, title) in [("https://a.com", "A"), ("https://b.com", "B")] {
        call(&app, "bookmark.add", json!({"dashboard_id": dashboard, "url": url, "title": title}));
    }

    let view = call(&app, "dashboard.view", json!({"dashboard_id": dashboard}));
    assert_eq!(titles(&view), vec!["B", "A"]);
    let id = view["rows"][1]["id"].as_str().unwrap().to_string();

    let res = call(&app, "bookmark.delete", json!({"dashboard_id": dashboard, "id": id}));
    assert_eq!(res, json!({"success": true}));

    let view = call(&app, "dashboard.view", json!({"dashboard_id": dashboard}));
    assert_eq!(titles(&view), vec!["B"]);
    assert!(handle_method(&app, "bookmark.delete", &json!({"dashboard_id": dashboard})).is_err());
}

// ─── Live sync ───

#[tokio::test]
async fn test_add_reaches_other_dashboard_through_feed() {
    let (app, _tmp, first) = signed_in();
    let second = open_dashboard(&app);

    let mut changes = {
        let app = app.lock().unwrap();
        let dashboard = app.dashboard(&second).unwrap();
        assert!(dashboard.feed_channel().is_some());
        dashboard.reconciler().changes()
    };

    call(
        &app,
        "bookmark.add",
        json!({"dashboard_id": first, "url": "https://docs.rs", "title": "Docs"}),
    );
    tokio::time::timeout(Duration::from_secs(2), changes.changed())
        .await
        .expect("second dashboard should hear the insert")
        .unwrap();

    let view = call(&app, "dashboard.view", json!({"dashboard_id": second}));
    assert_eq!(titles(&view), vec!["Docs"]);
    assert_eq!(view["live"], true);
}
