//! Smartmarks: a minimal personal bookmark manager with live sync.
//!
//! Console demo: two dashboards for the same user share one change feed; an add
//! or delete made through one shows up in the other without a re-render.

use std::error::Error;
use std::time::Duration;

use smartmarks::app::App;
use smartmarks::config::{init_logging, Config};
use smartmarks::managers::dashboard::Dashboard;
use smartmarks::types::dashboard::DashboardView;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    init_logging(&config);

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Smartmarks v{} — Demo Mode                   ║", env!("CARGO_PKG_VERSION"));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut app = App::in_memory()?;

    section("Routing (signed out)");
    println!("  / -> {:?}", app.route("/"));
    println!("  /dashboard -> {:?}", app.route("/dashboard"));
    println!();

    section("Sign in");
    let session = app.sign_in("demo@example.com")?;
    println!("  Signed in as {} ({})", session.user.email, session.user.id);
    println!("  / -> {:?}", app.route("/"));
    println!();

    section("Two dashboards, one feed");
    let first = app.open_dashboard()?;
    let second = app.open_dashboard()?;
    let (Some(a), Some(b)) = (app.dashboard(&first), app.dashboard(&second)) else {
        return Err("dashboards did not mount".into());
    };
    println!("  Dashboard A listening on {:?}", a.feed_channel());
    println!("  Dashboard B listening on {:?}", b.feed_channel());
    print_view("B (initial)", &b.view());

    a.request_add("https://www.rust-lang.org", "Rust")?;
    wait_for_change(b).await;
    print_view("B after A added", &b.view());

    a.request_add("https://docs.rs", "Docs.rs")?;
    wait_for_change(b).await;
    print_view("B after A added again", &b.view());

    match a.request_add("not-a-url", "Broken") {
        Ok(()) => println!("  unexpected: invalid url accepted"),
        Err(e) => println!("  Rejected invalid add: {}", e),
    }

    if let Some(row) = b.view().rows.first() {
        let id = row.id.clone();
        b.request_delete(&id)?;
        wait_for_change(a).await;
        print_view("A after B deleted", &a.view());
    }
    println!();

    section("Sign out");
    app.sign_out()?;
    println!("  Open dashboards: {}", app.dashboard_count());
    println!("  Open feed channels: {}", app.feed.channel_count());
    println!("  /dashboard -> {:?}", app.route("/dashboard"));
    println!();

    Ok(())
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_view(label: &str, view: &DashboardView) {
    println!("  [{}] live={} rows={}", label, view.live, view.rows.len());
    if let Some(message) = &view.empty_message {
        println!("    {}", message);
    }
    for row in &view.rows {
        println!("    • {} — {} · {}", row.title, row.domain, row.created_label);
    }
}

/// Waits briefly for the dashboard's list to change through its feed.
async fn wait_for_change(dashboard: &Dashboard) {
    let mut changes = dashboard.reconciler().changes();
    let _ = tokio::time::timeout(Duration::from_millis(250), changes.changed()).await;
}
