//! 应用程序设置数据模型

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// 媒体库设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibrarySettings {
    /// 内容根目录（MEDIA_ROOT）
    pub media_root: Option<PathBuf>,
    /// 缩略图目录（THUMBNAIL_ROOT），为空时使用应用数据目录
    pub thumbnail_root: Option<PathBuf>,
    /// 数据库文件路径，为空时使用应用数据目录
    pub database_path: Option<PathBuf>,
    /// 扫描时跳过的目录名
    pub exclude_dirs: Vec<String>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            media_root: None,
            thumbnail_root: None,
            database_path: None,
            exclude_dirs: vec![
                String::from("node_modules"),
                String::from("$RECYCLE.BIN"),
                String::from("System Volume Information"),
            ],
        }
    }
}

/// 外部工具设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

/// 缩略图设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThumbnailSettings {
    /// 最长边（像素）
    pub max_edge: u32,
    /// JPEG 质量 (1-100)
    pub quality: u8,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            max_edge: 500,
            quality: 80,
        }
    }
}

/// 性能设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceSettings {
    /// 同时处理的文件数（0 = 自动）
    pub scan_concurrency: usize,
    /// 哈希线程数（0 = 自动）
    pub hash_threads: usize,
    /// 清理阶段每批删除的记录数
    pub cleanup_batch_size: usize,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            scan_concurrency: 0,
            hash_threads: 0,
            cleanup_batch_size: 100,
        }
    }
}

impl PerformanceSettings {
    /// 实际使用的并发数
    pub fn effective_concurrency(&self) -> usize {
        if self.scan_concurrency > 0 {
            self.scan_concurrency
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

/// 应用程序设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub library: LibrarySettings,
    pub tools: ToolSettings,
    pub thumbnail: ThumbnailSettings,
    pub performance: PerformanceSettings,
}

impl AppSettings {
    /// 用环境变量覆盖设置
    ///
    /// `lookup` 一般为 `std::env::var(..).ok()`，测试中可替换。
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("MEDIA_ROOT") {
            self.library.media_root = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("THUMBNAIL_ROOT") {
            self.library.thumbnail_root = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("DATABASE_PATH") {
            self.library.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty("FFPROBE_PATH") {
            self.tools.ffprobe_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty("FFMPEG_PATH") {
            self.tools.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty("SCAN_CONCURRENCY") {
            self.performance.scan_concurrency = v.trim().parse().map_err(|_| {
                AppError::Config(format!("SCAN_CONCURRENCY 不是有效的整数: {}", v))
            })?;
        }
        Ok(())
    }

    /// 校验必要设置
    pub fn validate(&self) -> AppResult<()> {
        if self.library.media_root.is_none() {
            return Err(AppError::Config("未配置内容根目录 (MEDIA_ROOT)".to_string()));
        }
        if self.thumbnail.max_edge == 0 {
            return Err(AppError::Config("缩略图最长边必须大于 0".to_string()));
        }
        if !(1..=100).contains(&self.thumbnail.quality) {
            return Err(AppError::Config("缩略图质量必须在 1-100 之间".to_string()));
        }
        if self.performance.cleanup_batch_size == 0 {
            return Err(AppError::Config("清理批大小必须大于 0".to_string()));
        }
        Ok(())
    }
}
