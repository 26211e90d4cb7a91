//! Platform-specific utilities for database paths.
//!
//! Provides cross-platform functions to determine the appropriate
//! location for storing the feature cache on Windows, macOS, and Linux.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "FeatureCache";

/// Get the default database directory for the current platform.
///
/// Returns platform-specific paths:
/// - **Windows**: `%APPDATA%\FeatureCache\db\`
/// - **macOS**: `~/Library/Application Support/FeatureCache/db/`
/// - **Linux**: `~/.local/share/FeatureCache/db/`
///
/// Falls back to `./FeatureCache/db` when the platform has no data dir.
///
/// # Examples
///
/// ```
/// use common::platform::get_default_db_path;
///
/// let db_path = get_default_db_path();
/// println!("Database will be stored at: {:?}", db_path);
/// ```
pub fn get_default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("db")
}

/// Create the database directory (and parents) if it does not exist yet.
pub fn ensure_db_directory(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
