// Smartmarks shared type definitions
// Each submodule defines types used across the application.

pub mod bookmark;
pub mod dashboard;
pub mod errors;
pub mod feed;
pub mod session;
