// Smartmarks state managers
// Managers own stateful pieces: the bookmark store, the reconciled list, and the dashboard that ties them together.

pub mod bookmark_manager;
pub mod dashboard;
pub mod reconciler;
