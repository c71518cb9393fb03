//! 扫描相关命令

use shootsync_core::{CommandError, ScanStatus, SyncReport};

use crate::AppState;

/// 启动完整扫描并等待完成
pub async fn start_full_scan(state: &AppState) -> Result<SyncReport, CommandError> {
    state.core.run_full_scan().await.map_err(CommandError::from)
}

/// 获取扫描状态（供轮询）
pub fn get_scan_status(state: &AppState) -> Result<ScanStatus, CommandError> {
    Ok(state.core.scan_status().snapshot())
}

/// 取消正在运行的扫描，返回收到取消信号的任务数
pub fn cancel_scan(state: &AppState) -> Result<usize, CommandError> {
    let cancelled = state.core.cancel_scans();
    tracing::info!("已请求取消 {} 个扫描任务", cancelled);
    Ok(cancelled)
}

/// 清空扫描状态
pub fn reset_scan_status(state: &AppState) -> Result<(), CommandError> {
    state
        .core
        .scan_status()
        .reset()
        .map_err(CommandError::from)
}
