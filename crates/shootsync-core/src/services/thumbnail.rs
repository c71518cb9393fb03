//! 缩略图生成服务
//!
//! 图片用 image 裁剪缩放后编码为 JPEG；视频用 ffmpeg 截取一帧

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use sha2::{Digest, Sha256};
use tokio::process::Command;

use crate::models::{ImageMetadata, MediaMetadata, ThumbnailSettings, VideoMetadata};
use crate::utils::error::{AppError, AppResult};
use crate::utils::path::{resolve_path, sanitize_filename_component};

use super::format::{FormatClassifier, MediaKind};

/// 缩略图最长边（像素）
pub const THUMBNAIL_MAX_EDGE: u32 = 500;

/// 缩略图文件名后缀
const THUMBNAIL_SUFFIX: &str = "_thumb.jpg";

/// 临时文件序号，保证同一进程内的临时文件名不重复
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 计算缩略图尺寸（最长边 500）
pub fn thumbnail_dimensions(width: u32, height: u32) -> (u32, u32) {
    thumbnail_dimensions_with(width, height, THUMBNAIL_MAX_EDGE)
}

/// 计算缩略图尺寸
///
/// 最长边不超过 `max_edge` 时保持原尺寸，否则等比缩放并四舍五入。
pub fn thumbnail_dimensions_with(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge {
        return (width, height);
    }

    let scale = f64::from(max_edge) / f64::from(longest);
    let scaled = |v: u32| ((f64::from(v) * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// 缩略图生成器
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    thumbnail_root: PathBuf,
    ffmpeg_path: PathBuf,
    max_edge: u32,
    quality: u8,
}

impl ThumbnailGenerator {
    pub fn new(thumbnail_root: PathBuf, ffmpeg_path: PathBuf) -> Self {
        Self::with_settings(thumbnail_root, ffmpeg_path, &ThumbnailSettings::default())
    }

    pub fn with_settings(
        thumbnail_root: PathBuf,
        ffmpeg_path: PathBuf,
        settings: &ThumbnailSettings,
    ) -> Self {
        Self {
            thumbnail_root,
            ffmpeg_path,
            max_edge: settings.max_edge,
            quality: settings.quality,
        }
    }

    pub fn thumbnail_root(&self) -> &Path {
        &self.thumbnail_root
    }

    /// 缩略图输出路径：`<缩略图目录>/<源文件名>_<路径摘要>_thumb.jpg`
    ///
    /// 文件名保留扩展名，路径摘要取源文件绝对路径 SHA-256 的前 8 位，
    /// 同名文件（不同扩展名或不同目录）不会共用一个缩略图。
    pub fn thumbnail_path_for(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let digest = Sha256::digest(resolve_path(source).to_string_lossy().as_bytes());
        let tag: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();

        self.thumbnail_root.join(format!(
            "{}_{}{}",
            sanitize_filename_component(&name).replace('.', "_"),
            tag,
            THUMBNAIL_SUFFIX
        ))
    }

    /// 生成缩略图，返回输出路径
    ///
    /// 先写入缩略图目录下的临时文件，完成后再重命名到最终路径。
    pub async fn generate(&self, path: &Path, metadata: &MediaMetadata) -> AppResult<PathBuf> {
        let thumb_error = |cause: String| AppError::thumbnail(path.display().to_string(), cause);

        let is_file = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(thumb_error("源文件不存在".to_string()));
        }

        tokio::fs::create_dir_all(&self.thumbnail_root)
            .await
            .map_err(|e| thumb_error(e.to_string()))?;

        let output = self.thumbnail_path_for(path);
        let temp = temp_path_for(&output);

        let written = match (FormatClassifier::kind_of(path), metadata) {
            (Some(MediaKind::Image), MediaMetadata::Image(image)) => {
                let generator = self.clone();
                let source = path.to_path_buf();
                let target = temp.clone();
                let image = image.clone();
                tokio::task::spawn_blocking(move || {
                    generator.generate_image(&source, &image, &target)
                })
                .await
                .map_err(|e| thumb_error(e.to_string()))
                .and_then(|result| result)
            }
            (Some(MediaKind::Video), MediaMetadata::Video(video)) => {
                self.generate_video(path, video, &temp).await
            }
            (kind, _) => Err(thumb_error(format!(
                "不支持的类型或元数据不匹配: {:?}",
                kind
            ))),
        };

        let finished = match written {
            Ok(()) => tokio::fs::rename(&temp, &output)
                .await
                .map_err(|e| thumb_error(e.to_string())),
            Err(e) => Err(e),
        };
        if let Err(e) = finished {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        tracing::debug!("生成缩略图: {:?} -> {:?}", path, output);
        Ok(output)
    }

    /// 图片：居中裁剪填充到目标尺寸后编码为 JPEG
    fn generate_image(
        &self,
        source: &Path,
        metadata: &ImageMetadata,
        output: &Path,
    ) -> AppResult<()> {
        let thumb_error = |cause: String| AppError::thumbnail(source.display().to_string(), cause);

        let (width, height) =
            thumbnail_dimensions_with(metadata.width, metadata.height, self.max_edge);

        // 按文件内容识别格式，与元数据阶段一致
        let img = ImageReader::open(source)
            .map_err(|e| thumb_error(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| thumb_error(e.to_string()))?
            .decode()
            .map_err(|e| thumb_error(e.to_string()))?;
        let thumbnail = img.resize_to_fill(width, height, FilterType::Lanczos3);
        let rgb = DynamicImage::ImageRgb8(thumbnail.to_rgb8());

        let file = fs::File::create(output).map_err(|e| thumb_error(e.to_string()))?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), self.quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| thumb_error(e.to_string()))?;

        Ok(())
    }

    /// 视频：在 10% 处（不早于第 1 秒）截取一帧
    async fn generate_video(
        &self,
        source: &Path,
        metadata: &VideoMetadata,
        output: &Path,
    ) -> AppResult<()> {
        let thumb_error = |cause: String| AppError::thumbnail(source.display().to_string(), cause);

        let (width, height) =
            thumbnail_dimensions_with(metadata.width, metadata.height, self.max_edge);
        let seek = video_seek_seconds(metadata.duration);

        let result = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-y", "-ss"])
            .arg(seek.to_string())
            .arg("-i")
            .arg(source)
            .args(["-frames:v", "1", "-vf"])
            .arg(format!("scale={}:{}", width, height))
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                thumb_error(format!(
                    "无法启动 ffmpeg ({}): {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(thumb_error(format!(
                "ffmpeg 退出码 {:?}: {}",
                result.status.code(),
                stderr.trim()
            )));
        }

        if !output.is_file() {
            return Err(thumb_error("ffmpeg 未生成输出文件".to_string()));
        }

        Ok(())
    }
}

/// 与最终路径同目录的临时文件，保留 `.jpg` 扩展名供 ffmpeg 识别输出格式
fn temp_path_for(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    output.with_file_name(format!(".{}.{}.{}.tmp.jpg", name, std::process::id(), n))
}

/// 视频截帧位置（秒）
pub fn video_seek_seconds(duration: u64) -> u64 {
    (duration / 10).max(1)
}
