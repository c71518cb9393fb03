//! 格式识别服务
//!
//! 仅根据扩展名判断是否支持以及 MIME 类型，不做任何 IO

use std::path::Path;

use serde::{Deserialize, Serialize};

/// 未知格式的 MIME 类型
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// 媒体大类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Video,
}

/// 支持的格式表：扩展名 -> (MIME, 类型)
const FORMAT_TABLE: &[(&str, &str, MediaKind)] = &[
    ("jpg", "image/jpeg", MediaKind::Image),
    ("jpeg", "image/jpeg", MediaKind::Image),
    ("png", "image/png", MediaKind::Image),
    ("gif", "image/gif", MediaKind::Image),
    ("webp", "image/webp", MediaKind::Image),
    ("bmp", "image/bmp", MediaKind::Image),
    ("tif", "image/tiff", MediaKind::Image),
    ("tiff", "image/tiff", MediaKind::Image),
    ("mp4", "video/mp4", MediaKind::Video),
    ("m4v", "video/x-m4v", MediaKind::Video),
    ("mov", "video/quicktime", MediaKind::Video),
    ("avi", "video/x-msvideo", MediaKind::Video),
    ("mkv", "video/x-matroska", MediaKind::Video),
    ("webm", "video/webm", MediaKind::Video),
];

/// 格式判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatVerdict {
    pub supported: bool,
    pub mime_type: String,
    pub kind: Option<MediaKind>,
}

/// 格式识别器
pub struct FormatClassifier;

impl FormatClassifier {
    /// 根据小写扩展名判定格式
    pub fn classify(path: &Path) -> FormatVerdict {
        let entry = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| FORMAT_TABLE.iter().find(|(e, _, _)| *e == ext));

        match entry {
            Some((_, mime, kind)) => FormatVerdict {
                supported: true,
                mime_type: (*mime).to_string(),
                kind: Some(*kind),
            },
            None => FormatVerdict {
                supported: false,
                mime_type: FALLBACK_MIME.to_string(),
                kind: None,
            },
        }
    }

    /// 是否为支持的媒体文件
    pub fn is_supported(path: &Path) -> bool {
        Self::kind_of(path).is_some()
    }

    pub fn kind_of(path: &Path) -> Option<MediaKind> {
        Self::classify(path).kind
    }
}
