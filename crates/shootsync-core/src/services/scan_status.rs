//! 扫描状态存储
//!
//! 进程内唯一的可变共享状态：是否正在扫描 + 每个文件的处理状态。
//! 各个文件流水线并发写入，每个键后写覆盖先写。

use parking_lot::Mutex;

use crate::models::{FileStatus, ScanStatus};
use crate::utils::error::{AppError, AppResult};

/// 扫描状态存储
#[derive(Debug, Default)]
pub struct ScanStatusStore {
    inner: Mutex<ScanStatus>,
}

impl ScanStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态的快照
    pub fn snapshot(&self) -> ScanStatus {
        self.inner.lock().clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.lock().is_scanning
    }

    /// 开始扫描：已在扫描时返回 `ScanInProgress`，否则清空文件表
    ///
    /// 检查和置位在同一把锁内完成，两个并发调用只有一个能成功。
    pub fn try_begin(&self) -> AppResult<()> {
        let mut status = self.inner.lock();
        if status.is_scanning {
            return Err(AppError::ScanInProgress);
        }
        status.is_scanning = true;
        status.files.clear();
        Ok(())
    }

    /// 结束扫描，保留文件状态供查看
    pub fn finish(&self) {
        self.inner.lock().is_scanning = false;
    }

    /// 为每个路径写入 `Pending`
    pub fn seed<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut status = self.inner.lock();
        for path in paths {
            status.files.insert(path.into(), FileStatus::Pending);
        }
    }

    pub fn set_status(&self, path: &str, file_status: FileStatus) {
        self.inner.lock().files.insert(path.to_string(), file_status);
    }

    pub fn get(&self, path: &str) -> Option<FileStatus> {
        self.inner.lock().files.get(path).cloned()
    }

    /// 恢复初始状态
    ///
    /// 扫描进行中时拒绝重置，避免解除单次扫描保护。
    pub fn reset(&self) -> AppResult<()> {
        let mut status = self.inner.lock();
        if status.is_scanning {
            return Err(AppError::ScanInProgress);
        }
        *status = ScanStatus::default();
        Ok(())
    }
}
