// Smartmarks services
// Services are the collaborators around the dashboard: auth, the change feed and its listener, and display helpers.

pub mod auth_service;
pub mod change_feed;
pub mod display;
pub mod feed_listener;
