//! 拍摄目录识别服务
//!
//! 拍摄目录名格式为 `YYYY-MM-DD_<名称>`，文件只归属于其直接父目录对应的拍摄

use std::path::Path;
use std::sync::OnceLock;

use chrono::{Days, NaiveDate, Utc};
use regex::Regex;

use crate::models::{ParsedShootName, ShootInfo};
use crate::utils::error::{AppError, AppResult};
use crate::utils::path::{relative_to, resolve_path};

/// 允许的最早拍摄日期
const MIN_SHOOT_DATE: (i32, u32, u32) = (1990, 1, 1);
/// 允许晚于今天的最大天数
const MAX_FUTURE_DAYS: u64 = 365;

static SHOOT_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn shoot_pattern() -> AppResult<&'static Regex> {
    SHOOT_PATTERN
        .get_or_init(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})_(.+)$").ok())
        .as_ref()
        .ok_or_else(|| AppError::General("拍摄目录正则编译失败".to_string()))
}

/// 拍摄目录识别器
pub struct ShootClassifier;

impl ShootClassifier {
    /// 解析目录名
    ///
    /// 不符合格式返回 `InvalidPattern`；格式正确但日期无效或超出范围返回 `DateParse`。
    pub fn classify_folder_name(name: &str) -> AppResult<ParsedShootName> {
        let caps = shoot_pattern()?
            .captures(name)
            .ok_or_else(|| AppError::InvalidPattern(name.to_string()))?;

        let date_error = |reason: &str| AppError::DateParse {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let year: i32 = caps[1].parse().map_err(|_| date_error("年份无效"))?;
        let month: u32 = caps[2].parse().map_err(|_| date_error("月份无效"))?;
        let day: u32 = caps[3].parse().map_err(|_| date_error("日期无效"))?;

        if !(1..=12).contains(&month) {
            return Err(date_error("月份超出 1-12"));
        }
        if !(1..=31).contains(&day) {
            return Err(date_error("日期超出 1-31"));
        }

        // from_ymd_opt 对 2 月 30 日、平年 2 月 29 日等返回 None
        let shoot_date =
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| date_error("日历上不存在"))?;

        let (min_y, min_m, min_d) = MIN_SHOOT_DATE;
        let min_date = NaiveDate::from_ymd_opt(min_y, min_m, min_d)
            .ok_or_else(|| date_error("最早日期无效"))?;
        let today = Utc::now().date_naive();
        let max_date = today
            .checked_add_days(Days::new(MAX_FUTURE_DAYS))
            .unwrap_or(NaiveDate::MAX);

        if shoot_date < min_date || shoot_date > max_date {
            return Err(date_error("超出允许范围"));
        }

        let shoot_name = caps[4].trim().to_string();
        if shoot_name.is_empty() {
            return Err(AppError::InvalidPattern(name.to_string()));
        }

        Ok(ParsedShootName {
            shoot_name,
            shoot_date,
        })
    }

    /// 解析目录名；不是拍摄目录时返回 `None`
    pub fn parse_folder_name(name: &str) -> Option<ParsedShootName> {
        Self::classify_folder_name(name).ok()
    }

    /// 识别某个目录是否为拍摄目录
    pub fn detect_from_folder(folder_path: &Path, content_root: &Path) -> AppResult<ShootInfo> {
        let folder = resolve_path(folder_path);

        if !folder.exists() {
            return Err(AppError::FolderAccess {
                path: folder.display().to_string(),
                reason: "目录不存在".to_string(),
            });
        }
        if !folder.is_dir() {
            return Err(AppError::FolderAccess {
                path: folder.display().to_string(),
                reason: "路径不是目录".to_string(),
            });
        }

        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::InvalidPattern(folder.display().to_string()))?;

        let parsed = Self::classify_folder_name(&name)?;

        let relative_path = relative_to(content_root, &folder).ok_or_else(|| {
            AppError::InvalidPath(format!(
                "{} 不在内容根目录 {} 之下",
                folder.display(),
                content_root.display()
            ))
        })?;

        Ok(ShootInfo {
            shoot_name: parsed.shoot_name,
            shoot_date: parsed.shoot_date,
            folder_path: folder,
            relative_path,
        })
    }

    /// 获取文件所属的拍摄（仅看直接父目录）
    ///
    /// 父目录名不符合拍摄格式是常态，返回 `Ok(None)`；访问错误照常返回。
    pub fn get_shoot_for_file(file_path: &Path, content_root: &Path) -> AppResult<Option<ShootInfo>> {
        let file = resolve_path(file_path);
        let Some(parent) = file.parent() else {
            return Ok(None);
        };

        match Self::detect_from_folder(parent, content_root) {
            Ok(info) => Ok(Some(info)),
            Err(AppError::InvalidPattern(_)) | Err(AppError::DateParse { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
