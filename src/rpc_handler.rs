//! RPC method handler for the Smartmarks JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches a method call to the `App`.
//!
//! Action outcomes mirror what the pages show: validation and persistence
//! failures come back as `{"error": ..}` results for inline display, and a
//! missing session comes back as `{"redirect": "/"}`. Only malformed requests and
//! unknown dashboards are RPC errors.

use std::sync::Mutex;

use serde_json::{json, Value};

use crate::app::{App, LANDING_PATH};
use crate::services::auth_service::AuthProvider;
use crate::types::errors::{ActionError, DashboardError};

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, String> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing {}", name))
}

fn redirect_to_landing() -> Value {
    json!({ "redirect": LANDING_PATH })
}

/// Converts an add/delete outcome into the result shown by the form.
fn action_result(result: Result<(), ActionError>) -> Value {
    match result {
        Ok(()) => json!({ "success": true }),
        Err(ActionError::Unauthenticated) => redirect_to_landing(),
        Err(ActionError::Validation(e)) => json!({ "error": e.to_string(), "field": e.field().as_str() }),
        Err(e @ ActionError::Persistence(_)) => json!({ "error": e.to_string() }),
    }
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    let mut app = app.lock().map_err(|e| e.to_string())?;

    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Auth ───
        "auth.signIn" => {
            let email = str_param(params, "email")?;
            let session = app.sign_in(email).map_err(|e| e.to_string())?;
            Ok(json!({ "user": session.user }))
        }
        "auth.signOut" => {
            app.sign_out().map_err(|e| e.to_string())?;
            Ok(redirect_to_landing())
        }
        "auth.user" => Ok(json!({ "user": app.auth.current_user() })),

        // ─── Pages ───
        "page.route" => {
            let path = str_param(params, "path")?;
            serde_json::to_value(app.route(path)).map_err(|e| e.to_string())
        }

        // ─── Dashboard ───
        "dashboard.open" => match app.open_dashboard() {
            Ok(id) => {
                let view = app.dashboard(&id).map(|d| d.view());
                Ok(json!({ "dashboard_id": id, "view": view }))
            }
            Err(DashboardError::Unauthenticated) => Ok(redirect_to_landing()),
            Err(e) => Err(e.to_string()),
        },
        "dashboard.view" => {
            let id = str_param(params, "dashboard_id")?;
            let dashboard = app.dashboard(id).ok_or_else(|| format!("unknown dashboard: {}", id))?;
            serde_json::to_value(dashboard.view()).map_err(|e| e.to_string())
        }
        "dashboard.refresh" => {
            let id = str_param(params, "dashboard_id")?;
            let dashboard = app.dashboard(id).ok_or_else(|| format!("unknown dashboard: {}", id))?;
            let applied = dashboard.refresh().map_err(|e| e.to_string())?;
            Ok(json!({ "applied": applied, "view": dashboard.view() }))
        }
        "dashboard.close" => {
            let id = str_param(params, "dashboard_id")?;
            Ok(json!({ "ok": app.close_dashboard(id) }))
        }

        // ─── Bookmarks ───
        "bookmark.add" => {
            let id = str_param(params, "dashboard_id")?;
            let url = params.get("url").and_then(Value::as_str).unwrap_or("");
            let title = params.get("title").and_then(Value::as_str).unwrap_or("");
            match app.dashboard(id) {
                Some(dashboard) => Ok(action_result(dashboard.request_add(url, title))),
                None => Err(format!("unknown dashboard: {}", id)),
            }
        }
        "bookmark.delete" => {
            let id = str_param(params, "dashboard_id")?;
            let bookmark_id = str_param(params, "id")?;
            match app.dashboard(id) {
                Some(dashboard) => Ok(action_result(dashboard.request_delete(bookmark_id))),
                None => Err(format!("unknown dashboard: {}", id)),
            }
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
