//! 文件元数据提取服务
//!
//! 组合格式识别、文件状态读取和内容哈希，为每个文件生成 [`FileMetadata`]

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::jobs::CancelToken;
use crate::models::FileMetadata;
use crate::utils::error::{AppError, AppResult};
use crate::utils::path::{relative_to, resolve_path};

use super::format::FormatClassifier;
use super::hasher::FileHasher;

/// 文件系统状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// 文件状态探测
pub struct FileProbe;

impl FileProbe {
    /// 读取文件大小与时间戳
    ///
    /// 文件系统不提供创建时间时回退为修改时间。
    pub fn stat(path: &Path) -> AppResult<FileStats> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileDoesNotExist(path.display().to_string())
            } else {
                AppError::FileAccess {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

        if !metadata.is_file() {
            return Err(AppError::FileAccess {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "不是普通文件"),
            });
        }

        let modified_at: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| AppError::FileAccess {
                path: path.display().to_string(),
                source: e,
            })?
            .into();
        let created_at = metadata
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified_at);

        Ok(FileStats {
            size: metadata.len(),
            created_at,
            modified_at,
        })
    }
}

/// 文件元数据提取器
pub struct FileMetadataExtractor;

impl FileMetadataExtractor {
    /// 提取单个文件的元数据
    ///
    /// 先做不涉及 IO 的扩展名检查，再读取文件状态，最后计算哈希。
    pub fn extract(root: &Path, path: &Path) -> AppResult<FileMetadata> {
        let verdict = FormatClassifier::classify(path);
        if !verdict.supported {
            return Err(AppError::FileNotSupported(path.display().to_string()));
        }

        let absolute_path = resolve_path(path);
        let relative_path = relative_to(root, &absolute_path).ok_or_else(|| {
            AppError::InvalidPath(format!(
                "{} 不在内容根目录 {} 之下",
                absolute_path.display(),
                root.display()
            ))
        })?;

        let stats = FileProbe::stat(&absolute_path)?;
        let content_hash = FileHasher::hash_file(&absolute_path)?;

        let file_name = absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(FileMetadata {
            absolute_path,
            relative_path,
            file_name,
            file_size: stats.size,
            created_at: stats.created_at,
            modified_at: stats.modified_at,
            content_hash,
            mime_type: verdict.mime_type,
        })
    }

    /// 并行提取一批文件
    ///
    /// 单个文件失败只影响它自己的结果；取消后尚未开始的文件被跳过，不出现在结果中。
    /// `threads` 为 0 时使用 rayon 全局线程池。
    pub fn extract_batch(
        root: &Path,
        paths: &[PathBuf],
        threads: usize,
        cancel: &CancelToken,
    ) -> Vec<(PathBuf, AppResult<FileMetadata>)> {
        let run = || {
            paths
                .par_iter()
                .filter_map(|path| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some((path.clone(), Self::extract(root, path)))
                })
                .collect::<Vec<_>>()
        };

        if threads == 0 {
            return run();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!("创建哈希线程池失败，使用全局线程池: {}", e);
                run()
            }
        }
    }
}
