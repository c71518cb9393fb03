//! 媒体元数据提取服务
//!
//! 图片通过解码器读取文件头；视频通过 ffprobe 读取容器和流信息

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use exif::{In, Reader, Tag, Value};
use image::{ImageDecoder, ImageReader};
use serde::Deserialize;
use tokio::process::Command;

use crate::models::{ImageMetadata, MediaMetadata, VideoMetadata};
use crate::utils::error::{AppError, AppResult};

use super::format::{FormatClassifier, MediaKind};

/// ffprobe JSON 输出（只取需要的字段）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FfprobeFormat {
    duration: Option<String>,
    format_name: Option<String>,
}

/// 媒体元数据提取器
#[derive(Debug, Clone)]
pub struct MediaMetadataExtractor {
    ffprobe_path: PathBuf,
}

impl Default for MediaMetadataExtractor {
    fn default() -> Self {
        Self::new(PathBuf::from("ffprobe"))
    }
}

impl MediaMetadataExtractor {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// 按格式分派提取元数据
    pub async fn extract(&self, path: &Path) -> AppResult<MediaMetadata> {
        match FormatClassifier::kind_of(path) {
            None => Err(AppError::UnsupportedFormat(path.display().to_string())),
            Some(MediaKind::Image) => {
                let owned = path.to_path_buf();
                let metadata = tokio::task::spawn_blocking(move || Self::probe_image(&owned))
                    .await
                    .map_err(|e| AppError::ImageMetadata {
                        path: path.display().to_string(),
                        cause: e.to_string(),
                    })??;
                Ok(MediaMetadata::Image(metadata))
            }
            Some(MediaKind::Video) => Ok(MediaMetadata::Video(self.probe_video(path).await?)),
        }
    }

    /// 读取图片文件头
    pub fn probe_image(path: &Path) -> AppResult<ImageMetadata> {
        let image_error = |cause: String| AppError::ImageMetadata {
            path: path.display().to_string(),
            cause,
        };

        let reader = ImageReader::open(path)
            .map_err(|e| image_error(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| image_error(e.to_string()))?;

        let format = reader
            .format()
            .map(|f| format!("{:?}", f).to_lowercase())
            .ok_or_else(|| image_error("无法识别图片格式".to_string()))?;

        let decoder = reader
            .into_decoder()
            .map_err(|e| image_error(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        let has_alpha = decoder.color_type().has_alpha();

        if width == 0 || height == 0 {
            return Err(image_error(format!("尺寸无效: {}x{}", width, height)));
        }

        Ok(ImageMetadata {
            width,
            height,
            format,
            has_alpha,
            density: Self::read_density(path),
        })
    }

    /// 从 EXIF XResolution 读取像素密度
    fn read_density(path: &Path) -> Option<u32> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut reader).ok()?;
        let field = exif.get_field(Tag::XResolution, In::PRIMARY)?;

        match &field.value {
            Value::Rational(v) if !v.is_empty() && v[0].denom != 0 => {
                Some((v[0].num as f64 / v[0].denom as f64).round() as u32)
            }
            _ => None,
        }
    }

    /// 调用 ffprobe 读取视频信息
    pub async fn probe_video(&self, path: &Path) -> AppResult<VideoMetadata> {
        let video_error = |cause: String| AppError::VideoMetadata {
            path: path.display().to_string(),
            cause,
        };

        if !path.is_file() {
            return Err(video_error("文件不存在".to_string()));
        }

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                video_error(format!(
                    "无法启动 ffprobe ({}): {}",
                    self.ffprobe_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(video_error(format!(
                "ffprobe 退出码 {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        parse_ffprobe_output(path, &String::from_utf8_lossy(&output.stdout))
    }
}

/// 解析 ffprobe 的 JSON 输出
///
/// 取第一个宽高均为正数的视频流；容器时长四舍五入到秒，缺失时为 0。
pub fn parse_ffprobe_output(path: &Path, json: &str) -> AppResult<VideoMetadata> {
    let video_error = |cause: String| AppError::VideoMetadata {
        path: path.display().to_string(),
        cause,
    };

    let probe: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| video_error(format!("ffprobe 输出无法解析: {}", e)))?;

    let (width, height) = probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .find_map(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        })
        .ok_or_else(|| video_error("未找到有效的视频流".to_string()))?;

    let format = probe.format.unwrap_or_default();
    let duration = format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.round() as u64)
        .unwrap_or(0);

    Ok(VideoMetadata {
        width,
        height,
        duration,
        format: format.format_name.unwrap_or_else(|| "unknown".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_extract_png_with_alpha() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("alpha.png");
        RgbaImage::from_pixel(40, 30, Rgba([255, 0, 0, 128]))
            .save(&path)
            .unwrap();

        let extractor = MediaMetadataExtractor::default();
        match extractor.extract(&path).await.unwrap() {
            MediaMetadata::Image(meta) => {
                assert_eq!((meta.width, meta.height), (40, 30));
                assert_eq!(meta.format, "png");
                assert!(meta.has_alpha);
                assert_eq!(meta.density, None);
            }
            other => panic!("expected image metadata, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_jpeg_without_alpha() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        RgbImage::from_pixel(64, 48, Rgb([10, 20, 30])).save(&path).unwrap();

        let meta = MediaMetadataExtractor::default().extract(&path).await.unwrap();
        assert_eq!(meta.width(), 64);
        assert_eq!(meta.height(), 48);
        assert_eq!(meta.duration(), None);
        if let MediaMetadata::Image(image) = meta {
            assert!(!image.has_alpha);
            assert_eq!(image.format, "jpeg");
        }
    }

    #[tokio::test]
    async fn test_corrupt_image_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let result = MediaMetadataExtractor::default().extract(&path).await;
        match result {
            Err(AppError::ImageMetadata { path: p, cause }) => {
                assert!(p.ends_with("broken.jpg"));
                assert!(!cause.is_empty());
            }
            other => panic!("expected ImageMetadata error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let result = MediaMetadataExtractor::default()
            .extract(Path::new("/tmp/notes.txt"))
            .await;
        assert!(matches!(result, Err(AppError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_missing_ffprobe_binary() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clip.mp4");
        std::fs::write(&path, b"fake video").unwrap();

        let extractor = MediaMetadataExtractor::new(tmp.path().join("no-such-ffprobe"));
        let result = extractor.extract(&path).await;
        assert!(matches!(result, Err(AppError::VideoMetadata { .. })));
    }

    #[test]
    fn test_parse_ffprobe_output() {
        let json = r#"{
            "streams": [
                { "index": 0, "codec_type": "audio", "sample_rate": "48000" },
                { "index": 1, "codec_type": "video", "width": 1920, "height": 1080 }
            ],
            "format": { "format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "12.600000" }
        }"#;
        let meta = parse_ffprobe_output(Path::new("/m/clip.mp4"), json).unwrap();
        assert_eq!((meta.width, meta.height), (1920, 1080));
        assert_eq!(meta.duration, 13);
        assert_eq!(meta.format, "mov,mp4,m4a,3gp,3g2,mj2");
    }

    #[test]
    fn test_parse_ffprobe_missing_duration_defaults_to_zero() {
        let json = r#"{ "streams": [ { "codec_type": "video", "width": 640, "height": 360 } ], "format": {} }"#;
        let meta = parse_ffprobe_output(Path::new("c.webm"), json).unwrap();
        assert_eq!(meta.duration, 0);
        assert_eq!(meta.format, "unknown");
    }

    #[test]
    fn test_parse_ffprobe_without_video_stream() {
        let json = r#"{ "streams": [ { "codec_type": "audio" }, { "codec_type": "video", "width": 0, "height": 0 } ] }"#;
        assert!(matches!(
            parse_ffprobe_output(Path::new("c.mp4"), json),
            Err(AppError::VideoMetadata { .. })
        ));
        assert!(matches!(
            parse_ffprobe_output(Path::new("c.mp4"), "not json"),
            Err(AppError::VideoMetadata { .. })
        ));
    }
}
