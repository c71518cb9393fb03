//! Path provider abstraction.
//!
//! Resolves where the catalog database, generated thumbnails, settings
//! and logs live when the configuration does not say otherwise.

use std::path::PathBuf;
use std::sync::Arc;

/// Trait for providing application data paths.
pub trait PathProvider: Send + Sync {
    /// Get the root application data directory.
    fn app_data_dir(&self) -> PathBuf;

    /// Get the default thumbnails directory.
    fn thumbnails_dir(&self) -> PathBuf {
        self.app_data_dir().join("Thumbnails")
    }

    /// Get the settings file path.
    fn settings_path(&self) -> PathBuf {
        self.app_data_dir().join("Config").join("settings.json")
    }

    /// Get the logs directory.
    fn logs_dir(&self) -> PathBuf {
        self.app_data_dir().join("Logs")
    }

    /// Get the default database file path.
    fn database_path(&self) -> PathBuf {
        self.app_data_dir().join("Database").join("shootsync.db")
    }
}

/// Shared reference to a PathProvider implementation.
pub type SharedPathProvider = Arc<dyn PathProvider>;

/// Default provider rooted at the platform data directory
/// (`~/.local/share/ShootSync` on Linux, `%APPDATA%\ShootSync` on Windows).
#[derive(Debug, Clone)]
pub struct DataDirPathProvider {
    app_data_dir: PathBuf,
}

impl DataDirPathProvider {
    pub fn new() -> Self {
        let app_data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ShootSync");
        Self { app_data_dir }
    }

    /// Create a provider with a custom base directory.
    ///
    /// Useful for testing.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            app_data_dir: base_dir,
        }
    }
}

impl Default for DataDirPathProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PathProvider for DataDirPathProvider {
    fn app_data_dir(&self) -> PathBuf {
        self.app_data_dir.clone()
    }
}
