//! Smartmarks RPC Server: JSON-RPC over stdin/stdout for a UI shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmark.add", "params":{"dashboard_id":"...","url":"...","title":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Runs on a single-threaded runtime: requests and change-feed deliveries are
//! serialized onto one event loop.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use smartmarks::app::App;
use smartmarks::config::{init_logging, Config};
use smartmarks::rpc_handler::handle_method;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn emit(value: &Value) {
    println!("{}", value);
    let _ = io::stdout().flush();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            emit(&json!({"event": "fatal", "error": e.to_string()}));
            std::process::exit(2);
        }
    };
    init_logging(&config);

    let app = match App::from_config(&config) {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            log::error!("failed to initialize smartmarks: {}", e);
            emit(&json!({"event": "fatal", "error": e.to_string()}));
            std::process::exit(1);
        }
    };

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let mut rate_limiter = RateLimiter::new(config.rpc_rate_limit);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!("stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            emit(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params) {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);

        // Let listener tasks drain deliveries caused by this request.
        tokio::task::yield_now().await;
    }

    let mut app = app.into_inner().unwrap_or_else(|e| e.into_inner());
    app.shutdown();
}
