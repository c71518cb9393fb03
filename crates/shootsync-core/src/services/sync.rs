//! 目录同步服务
//!
//! 整合扫描、文件信息、拍摄识别、媒体元数据和缩略图，把内容根目录同步到数据库。
//!
//! 单个文件的流水线：元数据 → 拍摄 → 缩略图 → 写库，任何一步失败只影响该文件。
//! 全部流水线结束后删除本次扫描中已不存在的媒体记录。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::db::Database;
use crate::events::{
    EventSinkExt, SharedEventSink, EVENT_FILE_STATUS, EVENT_SCAN_FINISHED, EVENT_SCAN_STARTED,
};
use crate::jobs::CancelToken;
use crate::models::{
    FileMetadata, FileStatus, NewMedia, NewShoot, PerformanceSettings, ShootMatch, SyncReport,
    UpsertOutcome,
};
use crate::utils::error::{AppError, AppResult};
use crate::utils::path::resolve_path;

use super::file_metadata::FileMetadataExtractor;
use super::metadata::MediaMetadataExtractor;
use super::scan_status::ScanStatusStore;
use super::scanner::{ScanOptions, Scanner};
use super::shoot::ShootClassifier;
use super::thumbnail::ThumbnailGenerator;

/// 同步选项
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// 内容根目录
    pub media_root: PathBuf,
    /// 扫描选项
    pub scan_options: ScanOptions,
    /// 同时运行的文件流水线数
    pub concurrency: usize,
    /// 文件信息提取线程数（0 = 自动）
    pub hash_threads: usize,
    /// 清理阶段每批删除的记录数
    pub cleanup_batch_size: usize,
}

impl SyncOptions {
    pub fn new(media_root: PathBuf) -> Self {
        Self::from_settings(media_root, Vec::new(), &PerformanceSettings::default())
    }

    pub fn from_settings(
        media_root: PathBuf,
        exclude_dirs: Vec<String>,
        performance: &PerformanceSettings,
    ) -> Self {
        Self {
            media_root,
            scan_options: ScanOptions::new(exclude_dirs),
            concurrency: performance.effective_concurrency(),
            hash_threads: performance.hash_threads,
            cleanup_batch_size: performance.cleanup_batch_size.max(1),
        }
    }
}

/// 清理结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted: usize,
    pub errors: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanStartedEvent<'a> {
    job_id: u64,
    media_root: &'a str,
}

#[derive(Serialize)]
struct FileStatusEvent<'a> {
    path: &'a str,
    #[serde(flatten)]
    status: &'a FileStatus,
}

/// 在阻塞线程池上执行同步代码
async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::General(format!("后台任务失败: {}", e)))?
}

/// 文件流水线共享的依赖
struct Pipeline {
    db: Arc<Database>,
    status: Arc<ScanStatusStore>,
    metadata: MediaMetadataExtractor,
    thumbnails: ThumbnailGenerator,
    events: SharedEventSink,
    media_root: PathBuf,
}

impl Pipeline {
    fn update_status(&self, path: &str, status: FileStatus) {
        self.events.emit_typed(
            EVENT_FILE_STATUS,
            &FileStatusEvent {
                path,
                status: &status,
            },
        );
        self.status.set_status(path, status);
    }

    /// 处理单个文件，失败时记录为该文件的错误状态
    async fn process_file(&self, file: FileMetadata) -> AppResult<UpsertOutcome> {
        let key = file.absolute_path.to_string_lossy().into_owned();
        match self.run_stages(&key, &file).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!("处理文件失败 {}: {}", key, e);
                self.update_status(&key, FileStatus::from(&e));
                Err(e)
            }
        }
    }

    async fn run_stages(&self, key: &str, file: &FileMetadata) -> AppResult<UpsertOutcome> {
        let path = file.absolute_path.as_path();

        let metadata = self.metadata.extract(path).await?;
        self.update_status(key, FileStatus::MetadataExtracted);

        let shoot_id = self.resolve_shoot(path).await?;

        let thumbnail = self.thumbnails.generate(path, &metadata).await?;
        self.update_status(key, FileStatus::ThumbnailGenerated);

        let media = NewMedia::from_scan(
            file,
            &metadata,
            shoot_id,
            Some(thumbnail.to_string_lossy().into_owned()),
        );
        let db = Arc::clone(&self.db);
        let upserted = run_blocking(move || db.upsert_media(&media)).await?;
        self.update_status(key, FileStatus::DatabaseUpdated);

        tracing::debug!("{} -> {:?}", file.relative_path, upserted.outcome);
        Ok(upserted.outcome)
    }

    /// 识别父目录对应的拍摄并写库，返回拍摄 ID
    async fn resolve_shoot(&self, path: &Path) -> AppResult<Option<i64>> {
        let db = Arc::clone(&self.db);
        let file = path.to_path_buf();
        let root = self.media_root.clone();

        run_blocking(move || {
            let Some(info) = ShootClassifier::get_shoot_for_file(&file, &root)? else {
                return Ok(None);
            };
            let upserted = db.upsert_shoot(&NewShoot::from(&info), ShootMatch::FolderPath)?;
            if upserted.outcome != UpsertOutcome::Unchanged {
                tracing::info!(
                    "拍摄 {:?}: {} ({})",
                    upserted.outcome,
                    upserted.record.name,
                    info.relative_path
                );
            }
            Ok(Some(upserted.record.shoot_id))
        })
        .await
    }
}

/// 目录同步器
pub struct CatalogSynchronizer {
    pipeline: Arc<Pipeline>,
    options: SyncOptions,
}

impl CatalogSynchronizer {
    pub fn new(
        db: Arc<Database>,
        status: Arc<ScanStatusStore>,
        metadata: MediaMetadataExtractor,
        thumbnails: ThumbnailGenerator,
        events: SharedEventSink,
        options: SyncOptions,
    ) -> Self {
        let pipeline = Pipeline {
            db,
            status,
            metadata,
            thumbnails,
            events,
            media_root: resolve_path(&options.media_root),
        };
        Self {
            pipeline: Arc::new(pipeline),
            options,
        }
    }

    pub fn status(&self) -> &Arc<ScanStatusStore> {
        &self.pipeline.status
    }

    pub fn media_root(&self) -> &Path {
        &self.pipeline.media_root
    }

    /// 完整扫描并同步
    ///
    /// 已有扫描进行中返回 `ScanInProgress`；内容根目录不可访问返回 `FolderAccess`。
    /// 单个文件的失败只体现在扫描状态和返回的报告里。
    pub async fn start_full_scan(&self, cancel: CancelToken) -> AppResult<SyncReport> {
        self.pipeline.status.try_begin()?;

        // 无论成功、失败还是 future 被丢弃，都要结束扫描状态
        let _finalizer = scopeguard::guard(Arc::clone(&self.pipeline.status), |status| {
            status.finish();
        });

        let started = Instant::now();
        let root = self.pipeline.media_root.clone();
        let root_str = root.to_string_lossy().into_owned();

        tracing::info!("开始完整扫描: {}", root_str);
        self.pipeline.events.emit_typed(
            EVENT_SCAN_STARTED,
            &ScanStartedEvent {
                job_id: cancel.job_id(),
                media_root: &root_str,
            },
        );

        let mut report = SyncReport::default();

        // 1. 发现文件
        let scan_options = self.options.scan_options.clone();
        let scan_root = root.clone();
        let discovered =
            run_blocking(move || Scanner::new(scan_options).scan_directory(&scan_root)).await?;
        report.discovered = discovered.files.len();
        self.pipeline.status.seed(
            discovered
                .files
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );

        // 2. 文件信息（大小、时间、哈希）
        let hash_threads = self.options.hash_threads;
        let extract_root = root.clone();
        let extract_cancel = cancel.clone();
        let results = run_blocking(move || {
            Ok(FileMetadataExtractor::extract_batch(
                &extract_root,
                &discovered.files,
                hash_threads,
                &extract_cancel,
            ))
        })
        .await?;

        let mut files = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(file) => files.push(file),
                Err(e) => {
                    let key = path.to_string_lossy().into_owned();
                    tracing::warn!("读取文件信息失败 {}: {}", key, e);
                    report.failed += 1;
                    report.extraction_errors.push(format!("{}: {}", key, e));
                    self.pipeline.update_status(&key, FileStatus::from(&e));
                }
            }
        }
        report.extracted = files.len();

        let keep: HashSet<String> = files.iter().map(|f| f.relative_path.clone()).collect();

        // 3. 文件流水线（并发受限）
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        // 任务 ID → 扫描状态键，任务异常退出时用来标记对应文件
        let mut task_keys = HashMap::new();

        for file in files {
            if cancel.is_cancelled() {
                break;
            }
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| AppError::General(e.to_string()))?;
            // 等待许可期间可能已被取消
            if cancel.is_cancelled() {
                break;
            }
            let key = file.absolute_path.to_string_lossy().into_owned();
            let pipeline = Arc::clone(&self.pipeline);
            let handle = tasks.spawn(async move {
                let _permit = permit;
                pipeline.process_file(file).await
            });
            task_keys.insert(handle.id(), key);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(outcome))) => {
                    report.synced += 1;
                    match outcome {
                        UpsertOutcome::Created => report.created += 1,
                        UpsertOutcome::Updated => report.updated += 1,
                        UpsertOutcome::Unchanged => report.unchanged += 1,
                    }
                }
                Ok((_, Err(_))) => report.failed += 1,
                Err(e) => {
                    tracing::error!("文件处理任务异常退出: {}", e);
                    report.failed += 1;
                    if let Some(key) = task_keys.get(&e.id()) {
                        let err = AppError::General(format!("文件处理任务异常退出: {}", e));
                        self.pipeline.update_status(key, FileStatus::from(&err));
                    }
                }
            }
        }

        // 4. 清理
        report.cancelled = cancel.is_cancelled();
        if report.cancelled {
            tracing::info!("扫描已取消，跳过清理");
        } else {
            // 文件已经写库，清理失败只记录在报告里
            match self.cleanup_stale_media(keep).await {
                Ok(cleanup) => {
                    report.deleted = cleanup.deleted;
                    report.cleanup_errors = cleanup.errors;
                }
                Err(e) => {
                    tracing::error!("清理过期媒体失败: {}", e);
                    report.cleanup_errors.push(e.to_string());
                }
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "扫描完成: 发现 {}, 同步 {} (新增 {}, 更新 {}, 未变 {}), 失败 {}, 删除 {}, 耗时 {}ms",
            report.discovered,
            report.synced,
            report.created,
            report.updated,
            report.unchanged,
            report.failed,
            report.deleted,
            report.elapsed_ms
        );
        self.pipeline.events.emit_typed(EVENT_SCAN_FINISHED, &report);

        Ok(report)
    }

    /// 删除 filepath 不在 `keep` 中的媒体记录
    ///
    /// 分批删除，某批失败只记录错误，不影响其他批次。
    pub async fn cleanup_stale_media(&self, keep: HashSet<String>) -> AppResult<CleanupReport> {
        let db = Arc::clone(&self.pipeline.db);
        let batch_size = self.options.cleanup_batch_size.max(1);

        run_blocking(move || {
            let stale: Vec<i64> = db
                .get_media_filepaths()?
                .into_iter()
                .filter(|(_, filepath)| !keep.contains(filepath))
                .map(|(id, _)| id)
                .collect();

            let mut report = CleanupReport::default();
            for batch in stale.chunks(batch_size) {
                match db.delete_media_by_ids(batch) {
                    Ok(n) => report.deleted += n,
                    Err(e) => {
                        tracing::error!("删除过期媒体批次失败 ({} 条): {}", batch.len(), e);
                        report.errors.push(e.to_string());
                    }
                }
            }

            if report.deleted > 0 {
                tracing::info!("已删除 {} 条过期媒体记录", report.deleted);
            }
            Ok(report)
        })
        .await
    }

    /// 删除拍摄目录已不存在的拍摄记录，返回删除数量
    ///
    /// 完整扫描不会调用它。关联媒体的 shoot_id 由外键置空。
    pub async fn prune_vanished_shoots(&self) -> AppResult<usize> {
        let db = Arc::clone(&self.pipeline.db);

        run_blocking(move || {
            let vanished: Vec<i64> = db
                .get_all_shoots()?
                .into_iter()
                .filter(|s| {
                    s.folder_path
                        .as_deref()
                        .is_some_and(|folder| !Path::new(folder).is_dir())
                })
                .map(|s| s.shoot_id)
                .collect();

            let deleted = db.delete_shoots_by_ids(&vanished)?;
            if deleted > 0 {
                tracing::info!("已删除 {} 个目录不存在的拍摄", deleted);
            }
            Ok(deleted)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventSink, RecordingEventSink};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
        db: Arc<Database>,
        events: Arc<RecordingEventSink>,
        sync: CatalogSynchronizer,
    }

    fn fixture_with(options: impl FnOnce(&mut SyncOptions)) -> Fixture {
        let (tmp, root, db) = bare_env();
        let events = Arc::new(RecordingEventSink::new());

        let sync = build_sync(&tmp, &root, &db, events.clone(), options);

        Fixture {
            _tmp: tmp,
            root,
            db,
            events,
            sync,
        }
    }

    fn build_sync(
        tmp: &TempDir,
        root: &Path,
        db: &Arc<Database>,
        events: SharedEventSink,
        options: impl FnOnce(&mut SyncOptions),
    ) -> CatalogSynchronizer {
        let mut sync_options = SyncOptions::new(root.to_path_buf());
        sync_options.concurrency = 4;
        options(&mut sync_options);

        CatalogSynchronizer::new(
            Arc::clone(db),
            Arc::new(ScanStatusStore::new()),
            MediaMetadataExtractor::new(tmp.path().join("no-ffprobe")),
            ThumbnailGenerator::new(tmp.path().join("thumbs"), tmp.path().join("no-ffmpeg")),
            events,
            sync_options,
        )
    }

    /// 只有内容根目录和数据库的裸环境，事件接收器由测试自己提供
    fn bare_env() -> (TempDir, PathBuf, Arc<Database>) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("library");
        fs::create_dir_all(&root).unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.init().unwrap();
        (tmp, root, db)
    }

    /// 统计同时处于流水线中的文件数
    #[derive(Default)]
    struct InFlightSink {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl EventSink for InFlightSink {
        fn emit(&self, event_name: &str, payload_json: &str) {
            if event_name != EVENT_FILE_STATUS {
                return;
            }
            if payload_json.contains("\"metadataExtracted\"") {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(30));
            } else if payload_json.contains("\"databaseUpdated\"")
                || payload_json.contains("\"error\"")
            {
                self.current.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// 指定文件进入元数据完成阶段时 panic
    struct PanickingSink {
        file_name: &'static str,
    }

    impl EventSink for PanickingSink {
        fn emit(&self, event_name: &str, payload_json: &str) {
            if event_name == EVENT_FILE_STATUS
                && payload_json.contains("\"metadataExtracted\"")
                && payload_json.contains(self.file_name)
            {
                panic!("sink failure for {}", self.file_name);
            }
        }
    }

    /// 第一个文件完成元数据阶段时取消扫描
    struct CancellingSink {
        cancel: CancelToken,
    }

    impl EventSink for CancellingSink {
        fn emit(&self, event_name: &str, payload_json: &str) {
            if event_name == EVENT_FILE_STATUS && payload_json.contains("\"metadataExtracted\"") {
                self.cancel.cancel();
            }
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|_| {})
    }

    fn write_jpeg(path: &Path, width: u32, height: u32, shade: u8) {
        RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]))
            .save(path)
            .unwrap();
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn sample_media(filepath: &str) -> NewMedia {
        NewMedia {
            filepath: filepath.to_string(),
            filesize: 1,
            content_hash: "h".to_string(),
            width: 1,
            height: 1,
            duration: None,
            mime_type: "image/jpeg".to_string(),
            file_created_at: "t".to_string(),
            file_modified_at: "t".to_string(),
            shoot_id: None,
            thumbnail_path: None,
        }
    }

    #[tokio::test]
    async fn test_full_scan_isolates_failures() {
        let f = fixture();
        let shoot_dir = f.root.join("2024-01-15_Beach Sunset");
        fs::create_dir(&shoot_dir).unwrap();

        let a = shoot_dir.join("a.jpg");
        let b = f.root.join("b.png");
        let broken = shoot_dir.join("broken.jpg");
        let clip = f.root.join("clip.mp4");
        write_jpeg(&a, 800, 600, 10);
        RgbImage::from_pixel(100, 50, Rgb([1, 2, 3])).save(&b).unwrap();
        fs::write(&broken, b"not an image").unwrap();
        fs::write(&clip, b"not a video").unwrap();
        fs::write(f.root.join("notes.txt"), b"ignored").unwrap();

        let report = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();

        assert_eq!(report.discovered, 4);
        assert_eq!(report.extracted, 4);
        assert_eq!(report.synced, 2);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 2);
        assert!(!report.cancelled);

        let status = f.sync.status().snapshot();
        assert!(!status.is_scanning);
        assert_eq!(status.files.len(), 4);
        assert_eq!(status.files[&key(&a)], FileStatus::DatabaseUpdated);
        assert_eq!(status.files[&key(&b)], FileStatus::DatabaseUpdated);
        match &status.files[&key(&broken)] {
            FileStatus::Error { code, message } => {
                assert_eq!(code, "E_IMAGE_METADATA");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert!(matches!(
            &status.files[&key(&clip)],
            FileStatus::Error { code, .. } if code == "E_VIDEO_METADATA"
        ));

        let media_a = f
            .db
            .get_media_by_filepath("2024-01-15_Beach Sunset/a.jpg")
            .unwrap()
            .unwrap();
        assert_eq!((media_a.width, media_a.height), (800, 600));
        assert_eq!(media_a.duration, None);
        let thumb = media_a.thumbnail_path.clone().unwrap();
        assert_eq!(image::image_dimensions(&thumb).unwrap(), (500, 375));

        let shoot = f.db.get_shoot_by_name("Beach Sunset").unwrap().unwrap();
        assert_eq!(media_a.shoot_id, Some(shoot.shoot_id));
        assert_eq!(shoot.shoot_date, "2024-01-15");

        let media_b = f.db.get_media_by_filepath("b.png").unwrap().unwrap();
        assert_eq!(media_b.shoot_id, None);

        assert_eq!(f.events.count(EVENT_SCAN_STARTED), 1);
        assert_eq!(f.events.count(EVENT_SCAN_FINISHED), 1);
        assert!(f.events.count(EVENT_FILE_STATUS) >= 4);
    }

    #[tokio::test]
    async fn test_rescan_is_unchanged_then_updated() {
        let f = fixture();
        let a = f.root.join("a.jpg");
        let b = f.root.join("b.jpg");
        write_jpeg(&a, 64, 64, 10);
        write_jpeg(&b, 32, 32, 20);

        let first = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(first.created, 2);
        let before = f.db.get_media_by_filepath("a.jpg").unwrap().unwrap();

        let second = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(second.unchanged, 2);
        assert_eq!(second.created + second.updated, 0);
        let after = f.db.get_media_by_filepath("a.jpg").unwrap().unwrap();
        assert_eq!(before.updated_at, after.updated_at);

        write_jpeg(&a, 96, 64, 200);
        let third = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(third.updated, 1);
        assert_eq!(third.unchanged, 1);
        let changed = f.db.get_media_by_filepath("a.jpg").unwrap().unwrap();
        assert_eq!(changed.width, 96);
        assert_eq!(changed.media_id, before.media_id);
    }

    #[tokio::test]
    async fn test_removed_file_is_cleaned_up() {
        let f = fixture();
        let a = f.root.join("a.jpg");
        let b = f.root.join("b.jpg");
        write_jpeg(&a, 16, 16, 1);
        write_jpeg(&b, 16, 16, 2);
        f.sync.start_full_scan(CancelToken::detached()).await.unwrap();

        fs::remove_file(&b).unwrap();
        let report = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert!(report.cleanup_errors.is_empty());
        assert!(f.db.get_media_by_filepath("b.jpg").unwrap().is_none());
        assert!(f.db.get_media_by_filepath("a.jpg").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_deletes_exactly_missing_rows() {
        let f = fixture_with(|o| o.cleanup_batch_size = 2);
        for path in ["A", "B", "C"] {
            f.db.insert_media(&sample_media(path)).unwrap();
        }

        let keep: HashSet<String> = ["A", "C"].iter().map(|s| s.to_string()).collect();
        let cleanup = f.sync.cleanup_stale_media(keep).await.unwrap();
        assert_eq!(cleanup.deleted, 1);

        let remaining: Vec<String> = f
            .db
            .get_media_filepaths()
            .unwrap()
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(remaining, vec!["A".to_string(), "C".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_spans_multiple_batches() {
        let f = fixture_with(|o| o.cleanup_batch_size = 2);
        for i in 0..5 {
            f.db.insert_media(&sample_media(&format!("stale-{}", i))).unwrap();
        }
        let cleanup = f.sync.cleanup_stale_media(HashSet::new()).await.unwrap();
        assert_eq!(cleanup.deleted, 5);
        assert!(f.db.get_all_media().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_flight_guard() {
        let f = fixture();
        f.sync.status().try_begin().unwrap();

        let result = f.sync.start_full_scan(CancelToken::detached()).await;
        assert!(matches!(result, Err(AppError::ScanInProgress)));
        assert!(f.sync.status().is_scanning());

        f.sync.status().finish();
        assert!(f.sync.start_full_scan(CancelToken::detached()).await.is_ok());
        assert!(!f.sync.status().is_scanning());
    }

    #[tokio::test]
    async fn test_missing_root_releases_guard() {
        let f = fixture();
        fs::remove_dir_all(&f.root).unwrap();

        let result = f.sync.start_full_scan(CancelToken::detached()).await;
        assert!(matches!(result, Err(AppError::FolderAccess { .. })));
        assert!(!f.sync.status().is_scanning());

        fs::create_dir_all(&f.root).unwrap();
        assert!(f.sync.start_full_scan(CancelToken::detached()).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_scan_skips_cleanup() {
        let f = fixture();
        write_jpeg(&f.root.join("a.jpg"), 16, 16, 1);
        f.db.insert_media(&sample_media("stale.jpg")).unwrap();

        let cancel = CancelToken::detached();
        cancel.cancel();
        let report = f.sync.start_full_scan(cancel).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.synced, 0);
        assert_eq!(report.deleted, 0);
        assert!(f.db.get_media_by_filepath("stale.jpg").unwrap().is_some());
        assert!(!f.sync.status().is_scanning());
    }

    #[tokio::test]
    async fn test_prune_vanished_shoots() {
        let f = fixture();
        let shoot_dir = f.root.join("2024-03-01_Studio");
        fs::create_dir(&shoot_dir).unwrap();
        write_jpeg(&shoot_dir.join("a.jpg"), 16, 16, 1);
        f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(f.db.get_all_shoots().unwrap().len(), 1);

        assert_eq!(f.sync.prune_vanished_shoots().await.unwrap(), 0);

        fs::remove_dir_all(&shoot_dir).unwrap();
        assert_eq!(f.sync.prune_vanished_shoots().await.unwrap(), 1);
        assert!(f.db.get_all_shoots().unwrap().is_empty());
        let media = f
            .db
            .get_media_by_filepath("2024-03-01_Studio/a.jpg")
            .unwrap()
            .unwrap();
        assert_eq!(media.shoot_id, None);
    }

    #[tokio::test]
    async fn test_same_stem_files_keep_their_own_thumbnails() {
        let f = fixture();
        write_jpeg(&f.root.join("a.jpg"), 800, 200, 10);
        RgbImage::from_pixel(100, 300, Rgb([5, 5, 5]))
            .save(f.root.join("a.png"))
            .unwrap();

        let report = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(report.synced, 2);

        let jpg = f.db.get_media_by_filepath("a.jpg").unwrap().unwrap();
        let png = f.db.get_media_by_filepath("a.png").unwrap().unwrap();
        let jpg_thumb = jpg.thumbnail_path.unwrap();
        let png_thumb = png.thumbnail_path.unwrap();
        assert_ne!(jpg_thumb, png_thumb);
        assert_eq!(image::image_dimensions(&jpg_thumb).unwrap(), (500, 125));
        assert_eq!(image::image_dimensions(&png_thumb).unwrap(), (100, 300));
    }

    #[tokio::test]
    async fn test_misnamed_image_is_synced() {
        let f = fixture();
        let photo = f.root.join("photo.jpg");
        RgbImage::from_pixel(64, 64, Rgb([9, 9, 9]))
            .save_with_format(&photo, ImageFormat::Png)
            .unwrap();

        let report = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            f.sync.status().snapshot().files[&key(&photo)],
            FileStatus::DatabaseUpdated
        );
        let media = f.db.get_media_by_filepath("photo.jpg").unwrap().unwrap();
        assert_eq!((media.width, media.height), (64, 64));
    }

    #[tokio::test]
    async fn test_failed_cleanup_batch_does_not_stop_others() {
        let f = fixture_with(|o| o.cleanup_batch_size = 2);
        for i in 0..5 {
            f.db.insert_media(&sample_media(&format!("stale-{}", i))).unwrap();
        }
        f.db.connection()
            .unwrap()
            .execute_batch(
                r#"
                CREATE TRIGGER block_stale_2 BEFORE DELETE ON media
                WHEN OLD.filepath = 'stale-2'
                BEGIN
                    SELECT RAISE(ABORT, 'row is locked');
                END;
                "#,
            )
            .unwrap();

        let cleanup = f.sync.cleanup_stale_media(HashSet::new()).await.unwrap();
        assert_eq!(cleanup.errors.len(), 1);
        assert_eq!(cleanup.deleted, 3);

        // 失败批次整体回滚，其余批次照常删除
        let remaining: Vec<String> = f
            .db
            .get_media_filepaths()
            .unwrap()
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(remaining, vec!["stale-2".to_string(), "stale-3".to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_read_failure_is_reported_not_raised() {
        let f = fixture();
        f.db.connection()
            .unwrap()
            .execute_batch("DROP TABLE media;")
            .unwrap();

        let report = f.sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(report.cleanup_errors.len(), 1);
        assert_eq!(report.deleted, 0);
        assert!(!f.sync.status().is_scanning());
        assert_eq!(f.events.count(EVENT_SCAN_FINISHED), 1);
    }

    #[tokio::test]
    async fn test_panicking_pipeline_marks_file_error() {
        let (tmp, root, db) = bare_env();
        let good = root.join("good.jpg");
        let bad = root.join("bad.jpg");
        write_jpeg(&good, 16, 16, 1);
        write_jpeg(&bad, 16, 16, 2);

        let sync = build_sync(
            &tmp,
            &root,
            &db,
            Arc::new(PanickingSink { file_name: "bad.jpg" }),
            |_| {},
        );
        let report = sync.start_full_scan(CancelToken::detached()).await.unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 1);
        let status = sync.status().snapshot();
        assert_eq!(status.files[&key(&good)], FileStatus::DatabaseUpdated);
        assert!(matches!(
            &status.files[&key(&bad)],
            FileStatus::Error { code, .. } if code == "E_GENERAL"
        ));
        assert!(!status.is_scanning);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_permit_launches_nothing_more() {
        let (tmp, root, db) = bare_env();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            write_jpeg(&root.join(name), 16, 16, 1);
        }

        let cancel = CancelToken::detached();
        let sink = Arc::new(CancellingSink {
            cancel: cancel.clone(),
        });
        let sync = build_sync(&tmp, &root, &db, sink, |o| o.concurrency = 1);

        let report = sync.start_full_scan(cancel).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.synced, 1);

        let status = sync.status().snapshot();
        let pending = status
            .files
            .values()
            .filter(|s| **s == FileStatus::Pending)
            .count();
        assert_eq!(pending, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_limit_caps_in_flight_pipelines() {
        let (tmp, root, db) = bare_env();
        for i in 0..8 {
            write_jpeg(&root.join(format!("img-{}.jpg", i)), 16, 16, i as u8);
        }

        let sink = Arc::new(InFlightSink::default());
        let sync = build_sync(&tmp, &root, &db, sink.clone(), |o| o.concurrency = 2);

        let report = sync.start_full_scan(CancelToken::detached()).await.unwrap();
        assert_eq!(report.synced, 8);

        let peak = sink.peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= 2, "peak in-flight pipelines: {}", peak);
        assert_eq!(sink.current.load(Ordering::SeqCst), 0);
    }
}
