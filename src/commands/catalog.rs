//! 目录维护命令

use shootsync_core::{CommandError, DatabaseStats};

use crate::AppState;

/// 删除拍摄目录已不存在的拍摄记录
pub async fn prune_shoots(state: &AppState) -> Result<usize, CommandError> {
    state
        .core
        .synchronizer()
        .prune_vanished_shoots()
        .await
        .map_err(CommandError::from)
}

/// 获取数据库统计
pub async fn get_database_stats(state: &AppState) -> Result<DatabaseStats, CommandError> {
    let db = state.core.database().clone();
    tokio::task::spawn_blocking(move || db.stats())
        .await
        .map_err(|e| CommandError {
            code: "E_TASK_FAILED".to_string(),
            message: format!("统计任务失败: {}", e),
        })?
        .map_err(CommandError::from)
}
