//! 文件扫描服务
//!
//! 负责遍历内容根目录、过滤受支持的媒体文件

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::utils::error::{AppError, AppResult};

use super::format::FormatClassifier;

/// 扫描结果
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// 找到的媒体文件路径列表（按路径排序）
    pub files: Vec<PathBuf>,
    /// 扫描的目录数
    pub dirs_scanned: usize,
    /// 跳过的文件数
    pub files_skipped: usize,
}

/// 扫描选项
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    /// 排除的目录名（如 node_modules）
    pub exclude_dirs: Vec<String>,
    /// 最大扫描深度（0 表示无限制）
    pub max_depth: usize,
}

impl ScanOptions {
    pub fn new(exclude_dirs: Vec<String>) -> Self {
        Self {
            exclude_dirs,
            max_depth: 0,
        }
    }
}

/// 文件扫描器
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    /// 创建新的扫描器
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// 递归扫描内容根目录
    ///
    /// 根目录不存在或不是目录时返回 `FolderAccess`，这是整个扫描无法开始的情况。
    pub fn scan_directory(&self, path: &Path) -> AppResult<ScanResult> {
        if !path.exists() {
            return Err(AppError::FolderAccess {
                path: path.display().to_string(),
                reason: "目录不存在".to_string(),
            });
        }

        if !path.is_dir() {
            return Err(AppError::FolderAccess {
                path: path.display().to_string(),
                reason: "路径不是目录".to_string(),
            });
        }

        let mut walker = WalkDir::new(path).follow_links(false);
        if self.options.max_depth > 0 {
            walker = walker.max_depth(self.options.max_depth);
        }

        let base_path = path.to_path_buf();
        let mut files = Vec::new();
        let mut dirs_scanned = 0usize;
        let mut files_skipped = 0usize;

        for entry in walker
            .into_iter()
            .filter_entry(|e| self.should_include_entry(e, &base_path))
        {
            match entry {
                Ok(entry) => {
                    let entry_path = entry.path();

                    if entry.file_type().is_dir() {
                        dirs_scanned += 1;
                    } else if entry.file_type().is_file()
                        && FormatClassifier::is_supported(entry_path)
                    {
                        files.push(entry_path.to_path_buf());
                    } else {
                        files_skipped += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("扫描错误: {}", e);
                    files_skipped += 1;
                }
            }
        }

        files.sort();

        tracing::info!(
            "扫描完成: {} 个目录, {} 个媒体文件, {} 个跳过",
            dirs_scanned,
            files.len(),
            files_skipped
        );

        Ok(ScanResult {
            files,
            dirs_scanned,
            files_skipped,
        })
    }

    /// 检查是否应该包含此条目（返回 true 表示包含）
    fn should_include_entry(&self, entry: &walkdir::DirEntry, base_path: &Path) -> bool {
        // 文件总是包含，由后续逻辑判断是否是媒体文件
        if !entry.file_type().is_dir() {
            return true;
        }

        // 根目录本身总是包含
        if entry.path() == base_path {
            return true;
        }

        let name = entry.file_name().to_string_lossy();

        // 跳过隐藏目录
        if name.starts_with('.') {
            return false;
        }

        // 跳过排除列表中的目录
        !self.options.exclude_dirs.iter().any(|d| d == &*name)
    }
}
