//! ShootSync 数据模型模块
//!
//! 包含所有数据结构定义

pub mod media;
pub mod scan;
pub mod settings;
pub mod shoot;

// 重新导出常用类型
pub use media::{FileMetadata, ImageMetadata, Media, MediaMetadata, NewMedia, VideoMetadata};
pub use scan::{FileStatus, ScanStatus, SyncReport};
pub use settings::{
    AppSettings, LibrarySettings, PerformanceSettings, ThumbnailSettings, ToolSettings,
};
pub use shoot::{NewShoot, ParsedShootName, Shoot, ShootInfo, ShootMatch};

use chrono::{DateTime, SecondsFormat, Utc};

/// Upsert 的结果类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpsertOutcome {
    /// 新插入
    Created,
    /// 有字段变化，已更新
    Updated,
    /// 字段完全一致，未写入
    Unchanged,
}

/// Upsert 结果：操作类型 + 最终记录
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upserted<T> {
    pub outcome: UpsertOutcome,
    pub record: T,
}

/// 获取当前 UTC 时间（RFC 3339）
pub fn now_iso8601() -> String {
    to_iso8601(&Utc::now())
}

/// 统一的时间戳格式，保证同一时刻总是得到同一字符串
pub fn to_iso8601(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 空字符串视为缺省值
pub(crate) fn normalize_opt(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}
