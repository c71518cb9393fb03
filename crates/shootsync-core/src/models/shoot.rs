//! 拍摄（Shoot）数据模型

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::normalize_opt;

/// 从目录名解析出的拍摄信息（不含路径）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedShootName {
    /// 去除首尾空白后的名称
    pub shoot_name: String,
    pub shoot_date: NaiveDate,
}

/// 拍摄目录识别结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootInfo {
    pub shoot_name: String,
    pub shoot_date: NaiveDate,
    /// 拍摄目录绝对路径
    pub folder_path: PathBuf,
    /// 相对内容根目录的路径
    pub relative_path: String,
}

/// 拍摄记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shoot {
    pub shoot_id: i64,
    pub name: String,
    /// YYYY-MM-DD
    pub shoot_date: String,
    /// 自动识别的拍摄目录（绝对路径）
    pub folder_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Shoot {
    /// 去掉 ID 和时间戳后的可比较字段
    pub fn fields(&self) -> NewShoot {
        NewShoot {
            name: self.name.clone(),
            shoot_date: self.shoot_date.clone(),
            folder_path: self.folder_path.clone(),
        }
    }
}

/// 用于写入拍摄记录的输入结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShoot {
    pub name: String,
    pub shoot_date: String,
    pub folder_path: Option<String>,
}

impl NewShoot {
    pub fn normalized(&self) -> Self {
        Self {
            folder_path: normalize_opt(&self.folder_path),
            ..self.clone()
        }
    }

    /// 与已存储记录比较（忽略 ID 与时间戳）
    pub fn same_as(&self, existing: &Shoot) -> bool {
        self.normalized() == existing.fields().normalized()
    }
}

impl From<&ShootInfo> for NewShoot {
    fn from(info: &ShootInfo) -> Self {
        Self {
            name: info.shoot_name.clone(),
            shoot_date: info.shoot_date.format("%Y-%m-%d").to_string(),
            folder_path: Some(info.folder_path.to_string_lossy().into_owned()),
        }
    }
}

/// 拍摄 upsert 的匹配键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShootMatch {
    /// 按名称匹配
    Name,
    /// 按拍摄目录匹配
    FolderPath,
}
