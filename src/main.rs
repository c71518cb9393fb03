//! ShootSync 命令行入口
//!
//! 用法: `shootsync [scan|status|prune-shoots|stats]`，默认 `scan`。
//! 结果以 JSON 输出到 stdout；扫描过程中按 Ctrl-C 取消。

use std::sync::Arc;

use shootsync_core::{DataDirPathProvider, PathProvider};
use shootsync_lib::{init_logging, run, AppState, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let provider = Arc::new(DataDirPathProvider::new());
    let _log_guard = init_logging(Some(provider.logs_dir()));

    let command = Command::from_args(std::env::args().skip(1))?;
    tracing::info!("ShootSync 启动: {:?}", command);

    let state = AppState::initialize(provider)?;

    if command == Command::Scan {
        let core = Arc::clone(&state.core);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("收到中断信号，正在取消扫描...");
                core.cancel_scans();
            }
        });
    }

    let output = run(&state, command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
