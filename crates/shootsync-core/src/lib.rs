//! ShootSync Core Library
//!
//! This crate provides the media ingestion and catalog synchronization logic
//! for ShootSync. It is frontend-agnostic: the CLI in the root crate is one
//! host, but anything that can supply a [`PathProvider`] and an [`EventSink`]
//! can drive it.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `models`: Data structures (Media, Shoot, ScanStatus, Settings)
//! - `db`: SQLite database layer with DAOs and upsert logic
//! - `services`: Pipeline stages (scanner, hashing, shoot detection,
//!   media metadata, thumbnails) and the catalog synchronizer
//! - `events`: Event emission abstraction (EventSink trait)
//! - `paths`: Path provider abstraction (PathProvider trait)
//! - `jobs`: Job management and cancellation system
//! - `utils`: Error handling and path utilities
//!
//! # Example
//!
//! ```no_run
//! use shootsync_core::{
//!     events::LoggingEventSink, paths::DataDirPathProvider, AppSettings, ShootSyncCore,
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn run() -> shootsync_core::AppResult<()> {
//! let mut settings = AppSettings::default();
//! settings.library.media_root = Some(PathBuf::from("/srv/media"));
//!
//! let core = ShootSyncCore::new(
//!     settings,
//!     Arc::new(DataDirPathProvider::new()),
//!     Arc::new(LoggingEventSink),
//! )?;
//! let report = core.run_full_scan().await?;
//! println!("synced {} files", report.synced);
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod events;
pub mod jobs;
pub mod models;
pub mod paths;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use db::{Database, DatabaseStats};
pub use events::{EventSink, LoggingEventSink, NoOpEventSink, SharedEventSink};
pub use jobs::{CancelToken, JobId, JobManager};
pub use models::{AppSettings, FileStatus, Media, ScanStatus, Shoot, SyncReport};
pub use paths::{DataDirPathProvider, PathProvider, SharedPathProvider};
pub use services::{
    CatalogSynchronizer, MediaMetadataExtractor, ScanStatusStore, SettingsManager, SyncOptions,
    ThumbnailGenerator,
};
pub use utils::{AppError, AppResult, CommandError};

use std::sync::Arc;

/// ShootSync core application context.
///
/// Holds the shared resources a host needs: the catalog database, the
/// process-wide scan status and the synchronizer wired to both.
pub struct ShootSyncCore {
    /// Database connection
    pub db: Arc<Database>,
    /// Path provider for resolving application paths
    pub path_provider: SharedPathProvider,
    /// Event sink for scan progress
    pub event_sink: SharedEventSink,
    /// Job manager for tracking running scans
    pub job_manager: Arc<JobManager>,
    /// Effective settings (file + environment)
    pub settings: AppSettings,
    synchronizer: CatalogSynchronizer,
}

impl ShootSyncCore {
    /// Create a new core from validated settings.
    ///
    /// Missing thumbnail root / database path fall back to the path
    /// provider's defaults.
    pub fn new(
        settings: AppSettings,
        path_provider: SharedPathProvider,
        event_sink: SharedEventSink,
    ) -> AppResult<Self> {
        settings.validate()?;

        let media_root = settings
            .library
            .media_root
            .clone()
            .ok_or_else(|| AppError::Config("未配置内容根目录 (MEDIA_ROOT)".to_string()))?;

        let db_path = settings
            .library
            .database_path
            .clone()
            .unwrap_or_else(|| path_provider.database_path());
        let db = Database::open(db_path)?;
        db.init()?;
        let db = Arc::new(db);

        let thumbnail_root = settings
            .library
            .thumbnail_root
            .clone()
            .unwrap_or_else(|| path_provider.thumbnails_dir());

        let synchronizer = CatalogSynchronizer::new(
            Arc::clone(&db),
            Arc::new(ScanStatusStore::new()),
            MediaMetadataExtractor::new(settings.tools.ffprobe_path.clone()),
            ThumbnailGenerator::with_settings(
                thumbnail_root,
                settings.tools.ffmpeg_path.clone(),
                &settings.thumbnail,
            ),
            event_sink.clone(),
            SyncOptions::from_settings(
                media_root,
                settings.library.exclude_dirs.clone(),
                &settings.performance,
            ),
        );

        Ok(Self {
            db,
            path_provider,
            event_sink,
            job_manager: Arc::new(JobManager::new()),
            settings,
            synchronizer,
        })
    }

    /// Get the database reference.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Get the path provider reference.
    pub fn paths(&self) -> &SharedPathProvider {
        &self.path_provider
    }

    /// Get the job manager reference.
    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.job_manager
    }

    /// Get the process-wide scan status store.
    pub fn scan_status(&self) -> &Arc<ScanStatusStore> {
        self.synchronizer.status()
    }

    pub fn synchronizer(&self) -> &CatalogSynchronizer {
        &self.synchronizer
    }

    /// Run a full scan as a tracked, cancellable job.
    pub async fn run_full_scan(&self) -> AppResult<SyncReport> {
        let token = self.job_manager.start_job();
        let jobs = Arc::clone(&self.job_manager);
        let _complete = scopeguard::guard(token.job_id(), move |job_id| {
            jobs.complete_job(job_id);
        });

        self.synchronizer.start_full_scan(token).await
    }

    /// Signal every running scan to stop launching new work.
    pub fn cancel_scans(&self) -> usize {
        self.job_manager.cancel_all()
    }
}
