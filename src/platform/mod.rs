// Smartmarks platform paths
// Resolves where the database lives by default on Windows, macOS, and Linux.

use std::env;
use std::path::PathBuf;

/// Directory name used under the platform data root.
const APP_DIR: &str = "smartmarks";

fn home_dir() -> PathBuf {
    let var = if cfg!(target_os = "windows") { "USERPROFILE" } else { "HOME" };
    env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir())
}

/// Returns the platform-specific data directory for Smartmarks.
///
/// - **Linux**: `$XDG_DATA_HOME/smartmarks` or `~/.local/share/smartmarks`
/// - **macOS**: `~/Library/Application Support/smartmarks`
/// - **Windows**: `%APPDATA%/smartmarks`
pub fn get_data_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        return env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
            .join(APP_DIR);
    }
    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join(APP_DIR);
    }
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR),
        _ => home_dir().join(".local").join("share").join(APP_DIR),
    }
}
