//! App Core for Smartmarks.
//!
//! Wires the database, local auth, the change-feed hub and the mounted dashboards,
//! and routes the two pages.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::database::connection::Database;
use crate::managers::bookmark_manager::{BookmarkManager, BookmarkStore};
use crate::managers::dashboard::Dashboard;
use crate::services::auth_service::{AuthProvider, LocalAuth, TokenRegistry};
use crate::services::change_feed::{ChangeFeed, ChangeFeedHub};
use crate::types::dashboard::Page;
use crate::types::errors::{AuthError, DashboardError};
use crate::types::session::Session;

pub const LANDING_PATH: &str = "/";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Central application struct holding the collaborators and open dashboards.
pub struct App {
    pub db: Arc<Database>,
    pub auth: Arc<LocalAuth>,
    pub feed: ChangeFeedHub,
    dashboards: HashMap<String, Dashboard>,
}

impl App {
    /// Creates a new App backed by the SQLite file at `db_path`.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_database(Database::open(db_path)?))
    }

    /// Creates the data directory if needed and opens the configured database.
    pub fn from_config(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&config.data_dir)?;
        let path = config.db_path();
        log::info!("opening database at {}", path.display());
        Ok(Self::with_database(Database::open(path)?))
    }

    /// Creates an App whose data lives only as long as the process.
    pub fn in_memory() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    fn with_database(db: Database) -> Self {
        let db = Arc::new(db);
        let tokens = TokenRegistry::new();
        let auth = Arc::new(LocalAuth::new(db.clone(), tokens.clone()));
        let feed = ChangeFeedHub::new(tokens);

        Self {
            db,
            auth,
            feed,
            dashboards: HashMap::new(),
        }
    }

    /// A bookmark store that publishes its writes to this app's change feed.
    pub fn store(&self) -> Arc<dyn BookmarkStore> {
        Arc::new(BookmarkManager::with_feed(self.db.clone(), self.feed.clone()))
    }

    /// Signs in and unmounts the previous session's dashboards. A rejected
    /// sign-in leaves the current session and its dashboards in place.
    pub fn sign_in(&mut self, email: &str) -> Result<Session, AuthError> {
        let session = self.auth.sign_in(email)?;
        self.close_all_dashboards();
        Ok(session)
    }

    /// Signs out and unmounts every open dashboard.
    pub fn sign_out(&mut self) -> Result<(), AuthError> {
        self.close_all_dashboards();
        self.auth.sign_out()
    }

    /// Ends the session before the process exits.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.sign_out() {
            log::warn!("sign-out at shutdown failed: {}", e);
        }
    }

    /// Resolves a page request: the landing page is for signed-out users, the
    /// dashboard for signed-in ones, and each redirects to the other.
    pub fn route(&self, path: &str) -> Page {
        let user = self.auth.current_user();
        match (path, user) {
            (LANDING_PATH, None) => Page::Landing,
            (LANDING_PATH, Some(_)) => Page::Redirect {
                to: DASHBOARD_PATH.to_string(),
            },
            (DASHBOARD_PATH, Some(user)) => Page::Dashboard { email: user.email },
            (DASHBOARD_PATH, None) => Page::Redirect {
                to: LANDING_PATH.to_string(),
            },
            _ => Page::NotFound,
        }
    }

    /// Mounts a new dashboard and returns its id.
    pub fn open_dashboard(&mut self) -> Result<String, DashboardError> {
        let auth: Arc<dyn AuthProvider> = self.auth.clone();
        let feed: Arc<dyn ChangeFeed> = Arc::new(self.feed.clone());
        let dashboard = Dashboard::mount(auth, self.store(), feed)?;

        let id = Uuid::new_v4().to_string();
        self.dashboards.insert(id.clone(), dashboard);
        Ok(id)
    }

    pub fn dashboard(&self, id: &str) -> Option<&Dashboard> {
        self.dashboards.get(id)
    }

    /// Unmounts a dashboard. Returns `false` if it was not open.
    pub fn close_dashboard(&mut self, id: &str) -> bool {
        match self.dashboards.remove(id) {
            Some(dashboard) => {
                dashboard.unmount();
                true
            }
            None => false,
        }
    }

    pub fn dashboard_count(&self) -> usize {
        self.dashboards.len()
    }

    fn close_all_dashboards(&mut self) {
        for (_, dashboard) in self.dashboards.drain() {
            dashboard.unmount();
        }
    }
}
