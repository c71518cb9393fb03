//! ShootSync 错误处理模块
//!
//! 定义摄取流水线各阶段的错误类型

use serde::Serialize;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 扩展名不在支持列表中（文件元数据阶段）
    #[error("不支持的文件: {0}")]
    FileNotSupported(String),

    /// 文件不存在
    #[error("文件不存在: {0}")]
    FileDoesNotExist(String),

    /// 文件无法访问
    #[error("无法访问文件 {path}: {source}")]
    FileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 目录不存在或不是目录
    #[error("无法访问目录 {path}: {reason}")]
    FolderAccess { path: String, reason: String },

    /// 目录名不符合拍摄目录格式
    #[error("目录名不符合拍摄格式: {0}")]
    InvalidPattern(String),

    /// 目录名中的日期无效
    #[error("拍摄日期无效 {name}: {reason}")]
    DateParse { name: String, reason: String },

    /// 计算文件哈希失败
    #[error("计算哈希失败 {path}: {source}")]
    HashFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 不支持的媒体格式（媒体元数据阶段）
    #[error("不支持的格式: {0}")]
    UnsupportedFormat(String),

    /// 图片元数据提取失败
    #[error("图片元数据提取失败 {path}: {cause}")]
    ImageMetadata { path: String, cause: String },

    /// 视频元数据提取失败
    #[error("视频元数据提取失败 {path}: {cause}")]
    VideoMetadata { path: String, cause: String },

    /// 缩略图生成失败
    #[error("缩略图生成失败 {path}: {cause}")]
    Thumbnail { path: String, cause: String },

    /// 数据库错误
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    /// 已有扫描正在进行
    #[error("已有扫描正在进行")]
    ScanInProgress,

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 路径无效
    #[error("路径无效: {0}")]
    InvalidPath(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 通用错误
    #[error("{0}")]
    General(String),
}

impl AppError {
    /// 稳定的错误代码，用于扫描状态和命令返回值
    pub fn code(&self) -> &'static str {
        match self {
            AppError::FileNotSupported(_) => "E_FILE_NOT_SUPPORTED",
            AppError::FileDoesNotExist(_) => "E_FILE_NOT_FOUND",
            AppError::FileAccess { .. } => "E_FILE_ACCESS",
            AppError::FolderAccess { .. } => "E_FOLDER_ACCESS",
            AppError::InvalidPattern(_) => "E_INVALID_PATTERN",
            AppError::DateParse { .. } => "E_DATE_PARSE",
            AppError::HashFile { .. } => "E_HASH_FILE",
            AppError::UnsupportedFormat(_) => "E_UNSUPPORTED_FORMAT",
            AppError::ImageMetadata { .. } => "E_IMAGE_METADATA",
            AppError::VideoMetadata { .. } => "E_VIDEO_METADATA",
            AppError::Thumbnail { .. } => "E_THUMBNAIL",
            AppError::Database(_) => "E_DB_ERROR",
            AppError::ScanInProgress => "E_SCAN_IN_PROGRESS",
            AppError::Io(_) => "E_IO_ERROR",
            AppError::InvalidPath(_) => "E_PATH_INVALID",
            AppError::Config(_) => "E_CONFIG",
            AppError::General(_) => "E_GENERAL",
        }
    }

    /// 构造缩略图错误
    pub fn thumbnail(path: impl Into<String>, cause: impl ToString) -> Self {
        AppError::Thumbnail {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}

/// 用于命令返回的错误包装
#[derive(Debug, Clone, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
}

impl From<AppError> for CommandError {
    fn from(err: AppError) -> Self {
        CommandError {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

// 实现 Serialize 以便可以直接作为命令结果返回
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        CommandError {
            code: self.code().to_string(),
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}

/// 应用程序结果类型别名
pub type AppResult<T> = Result<T, AppError>;
