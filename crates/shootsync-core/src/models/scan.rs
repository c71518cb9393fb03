//! 扫描状态与扫描结果模型

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// 单个文件在一次扫描中的处理状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FileStatus {
    Pending,
    MetadataExtracted,
    ThumbnailGenerated,
    DatabaseUpdated,
    Error { code: String, message: String },
}

impl FileStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, FileStatus::Error { .. })
    }
}

impl From<&AppError> for FileStatus {
    fn from(err: &AppError) -> Self {
        FileStatus::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// 进程内扫描状态快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub is_scanning: bool,
    /// 绝对路径 -> 状态
    pub files: BTreeMap<String, FileStatus>,
}

impl ScanStatus {
    /// 统计处于错误状态的文件
    pub fn error_count(&self) -> usize {
        self.files.values().filter(|s| s.is_error()).count()
    }
}

/// 一次完整扫描的汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// 发现的受支持文件数
    pub discovered: usize,
    /// 成功读取文件信息的数量
    pub extracted: usize,
    /// 成功写入数据库的数量
    pub synced: usize,
    /// 失败数（含文件信息阶段）
    pub failed: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// 清理阶段删除的记录数
    pub deleted: usize,
    /// 文件信息阶段的失败列表
    pub extraction_errors: Vec<String>,
    /// 清理批次失败列表
    pub cleanup_errors: Vec<String>,
    /// 是否被取消
    pub cancelled: bool,
    pub elapsed_ms: u64,
}
