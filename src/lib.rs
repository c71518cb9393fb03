//! ShootSync - 媒体库扫描与拍摄目录同步工具
//!
//! 应用层：日志、配置加载和命令；摄取逻辑在 `shootsync-core`

pub mod commands;
pub mod logging;

use std::str::FromStr;
use std::sync::Arc;

use shootsync_core::{
    AppResult, AppSettings, LoggingEventSink, SettingsManager, SharedEventSink,
    SharedPathProvider, ShootSyncCore,
};

pub use logging::init_logging;

/// 应用程序状态
pub struct AppState {
    pub core: Arc<ShootSyncCore>,
}

impl AppState {
    /// 读取设置文件和环境变量后初始化
    pub fn initialize(provider: SharedPathProvider) -> AppResult<Self> {
        let settings = SettingsManager::new(provider.as_ref())?.load_with_env()?;
        Self::with_settings(settings, provider, Arc::new(LoggingEventSink))
    }

    pub fn with_settings(
        settings: AppSettings,
        provider: SharedPathProvider,
        events: SharedEventSink,
    ) -> AppResult<Self> {
        let core = ShootSyncCore::new(settings, provider, events)?;
        tracing::info!("数据库路径: {:?}", core.database().path());
        Ok(Self {
            core: Arc::new(core),
        })
    }
}

/// 命令行子命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Scan,
    Status,
    PruneShoots,
    Stats,
}

/// 子命令解析错误
#[derive(Debug, thiserror::Error)]
pub enum ParseCommandError {
    #[error("未知命令: {0}（可用: scan, status, prune-shoots, stats）")]
    Unknown(String),
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" => Ok(Command::Scan),
            "status" => Ok(Command::Status),
            "prune-shoots" => Ok(Command::PruneShoots),
            "stats" => Ok(Command::Stats),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

impl Command {
    /// 没有参数时默认执行扫描
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, ParseCommandError> {
        args.into_iter()
            .next()
            .map_or(Ok(Command::Scan), |arg| arg.parse())
    }
}

/// 执行命令，返回 JSON 结果
pub async fn run(state: &AppState, command: Command) -> anyhow::Result<serde_json::Value> {
    let value = match command {
        Command::Scan => serde_json::to_value(commands::start_full_scan(state).await?)?,
        Command::Status => serde_json::to_value(commands::get_scan_status(state)?)?,
        Command::PruneShoots => {
            serde_json::json!({ "deleted": commands::prune_shoots(state).await? })
        }
        Command::Stats => serde_json::to_value(commands::get_database_stats(state).await?)?,
    };
    Ok(value)
}
