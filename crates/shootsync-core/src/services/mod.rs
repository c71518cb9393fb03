//! ShootSync 服务模块
//!
//! 包含摄取流水线的各个阶段

pub mod file_metadata;
pub mod format;
pub mod hasher;
pub mod metadata;
pub mod scan_status;
pub mod scanner;
pub mod settings;
pub mod shoot;
pub mod sync;
pub mod thumbnail;

// 重新导出常用类型
pub use file_metadata::{FileMetadataExtractor, FileProbe, FileStats};
pub use format::{FormatClassifier, FormatVerdict, MediaKind};
pub use hasher::FileHasher;
pub use metadata::{parse_ffprobe_output, MediaMetadataExtractor};
pub use scan_status::ScanStatusStore;
pub use scanner::{ScanOptions, ScanResult, Scanner};
pub use settings::SettingsManager;
pub use shoot::ShootClassifier;
pub use sync::{CatalogSynchronizer, CleanupReport, SyncOptions};
pub use thumbnail::{thumbnail_dimensions, ThumbnailGenerator, THUMBNAIL_MAX_EDGE};
