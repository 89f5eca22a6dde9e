//! Smartmarks: a minimal personal bookmark manager with live cross-session sync.
//!
//! The core is [`managers::reconciler`]: it merges server snapshots and change-feed
//! events into one consistent list per dashboard. Authentication, persistence and
//! the change feed sit behind traits with local implementations.

pub mod app;
pub mod config;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
