//! 媒体数据模型

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::normalize_opt;

/// 单次扫描得到的文件信息（不落库）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// 绝对路径
    pub absolute_path: PathBuf,
    /// 相对内容根目录的路径（`/` 分隔，无前导分隔符）
    pub relative_path: String,
    /// 文件名
    pub file_name: String,
    /// 文件大小（字节）
    pub file_size: u64,
    /// 创建时间（文件系统不提供时回退为修改时间）
    pub created_at: DateTime<Utc>,
    /// 修改时间
    pub modified_at: DateTime<Utc>,
    /// 文件内容 SHA-256（小写十六进制）
    pub content_hash: String,
    /// MIME 类型
    pub mime_type: String,
}

/// 图片元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// 解码器识别出的格式名（jpeg / png / ...）
    pub format: String,
    pub has_alpha: bool,
    /// 像素密度 (DPI)，来自 EXIF XResolution
    pub density: Option<u32>,
}

/// 视频元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// 时长（秒，四舍五入）
    pub duration: u64,
    /// 容器格式名
    pub format: String,
}

/// 媒体元数据：图片或视频
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MediaMetadata {
    Image(ImageMetadata),
    Video(VideoMetadata),
}

impl MediaMetadata {
    pub fn width(&self) -> u32 {
        match self {
            MediaMetadata::Image(m) => m.width,
            MediaMetadata::Video(m) => m.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            MediaMetadata::Image(m) => m.height,
            MediaMetadata::Video(m) => m.height,
        }
    }

    /// 图片没有时长
    pub fn duration(&self) -> Option<u64> {
        match self {
            MediaMetadata::Image(_) => None,
            MediaMetadata::Video(m) => Some(m.duration),
        }
    }
}

/// 媒体记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    /// 媒体ID
    pub media_id: i64,
    /// 相对路径（业务主键，全局唯一）
    pub filepath: String,
    /// 文件大小（字节）
    pub filesize: i64,
    /// 文件内容哈希
    pub content_hash: String,
    pub width: i64,
    pub height: i64,
    /// 时长（秒），图片为空
    pub duration: Option<i64>,
    pub mime_type: String,
    pub file_created_at: String,
    pub file_modified_at: String,
    /// 所属拍摄
    pub shoot_id: Option<i64>,
    /// 缩略图路径
    pub thumbnail_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Media {
    /// 去掉 ID 和时间戳后的可比较字段
    pub fn fields(&self) -> NewMedia {
        NewMedia {
            filepath: self.filepath.clone(),
            filesize: self.filesize,
            content_hash: self.content_hash.clone(),
            width: self.width,
            height: self.height,
            duration: self.duration,
            mime_type: self.mime_type.clone(),
            file_created_at: self.file_created_at.clone(),
            file_modified_at: self.file_modified_at.clone(),
            shoot_id: self.shoot_id,
            thumbnail_path: self.thumbnail_path.clone(),
        }
    }
}

/// 用于写入媒体记录的输入结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedia {
    pub filepath: String,
    pub filesize: i64,
    pub content_hash: String,
    pub width: i64,
    pub height: i64,
    pub duration: Option<i64>,
    pub mime_type: String,
    pub file_created_at: String,
    pub file_modified_at: String,
    pub shoot_id: Option<i64>,
    pub thumbnail_path: Option<String>,
}

impl NewMedia {
    /// 由扫描结果组装待写入的记录
    pub fn from_scan(
        file: &FileMetadata,
        metadata: &MediaMetadata,
        shoot_id: Option<i64>,
        thumbnail_path: Option<String>,
    ) -> Self {
        Self {
            filepath: file.relative_path.clone(),
            filesize: file.file_size as i64,
            content_hash: file.content_hash.clone(),
            width: i64::from(metadata.width()),
            height: i64::from(metadata.height()),
            duration: metadata.duration().map(|d| d as i64),
            mime_type: file.mime_type.clone(),
            file_created_at: super::to_iso8601(&file.created_at),
            file_modified_at: super::to_iso8601(&file.modified_at),
            shoot_id,
            thumbnail_path,
        }
    }

    /// 统一空值表示，避免 `Some("")` 与 `None` 被判定为不同
    pub fn normalized(&self) -> Self {
        Self {
            thumbnail_path: normalize_opt(&self.thumbnail_path),
            ..self.clone()
        }
    }

    /// 与已存储记录比较（忽略 ID 与时间戳）
    pub fn same_as(&self, existing: &Media) -> bool {
        self.normalized() == existing.fields().normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_file() -> FileMetadata {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        FileMetadata {
            absolute_path: PathBuf::from("/library/2024-01-15_Beach/a.jpg"),
            relative_path: "2024-01-15_Beach/a.jpg".to_string(),
            file_name: "a.jpg".to_string(),
            file_size: 2048,
            created_at: t,
            modified_at: t,
            content_hash: "abc".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    #[test]
    fn test_from_scan_image_has_no_duration() {
        let meta = MediaMetadata::Image(ImageMetadata {
            width: 800,
            height: 600,
            format: "jpeg".to_string(),
            has_alpha: false,
            density: None,
        });
        let media = NewMedia::from_scan(&sample_file(), &meta, Some(3), None);
        assert_eq!(media.filepath, "2024-01-15_Beach/a.jpg");
        assert_eq!(media.duration, None);
        assert_eq!(media.shoot_id, Some(3));
        assert_eq!(media.file_created_at, "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn test_from_scan_video_duration() {
        let meta = MediaMetadata::Video(VideoMetadata {
            width: 1920,
            height: 1080,
            duration: 12,
            format: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        });
        let media = NewMedia::from_scan(&sample_file(), &meta, None, Some("t.jpg".into()));
        assert_eq!(media.duration, Some(12));
        assert_eq!(media.width, 1920);
    }

    #[test]
    fn test_same_as_treats_empty_thumbnail_as_absent() {
        let meta = MediaMetadata::Image(ImageMetadata {
            width: 10,
            height: 10,
            format: "png".to_string(),
            has_alpha: true,
            density: None,
        });
        let candidate = NewMedia::from_scan(&sample_file(), &meta, None, Some(String::new()));
        let stored = Media {
            media_id: 1,
            filepath: candidate.filepath.clone(),
            filesize: candidate.filesize,
            content_hash: candidate.content_hash.clone(),
            width: 10,
            height: 10,
            duration: None,
            mime_type: candidate.mime_type.clone(),
            file_created_at: candidate.file_created_at.clone(),
            file_modified_at: candidate.file_modified_at.clone(),
            shoot_id: None,
            thumbnail_path: None,
            created_at: "x".to_string(),
            updated_at: "y".to_string(),
        };
        assert!(candidate.same_as(&stored));
    }
}
