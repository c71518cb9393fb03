//! 日志初始化
//!
//! 控制台输出到 stderr（stdout 留给命令的 JSON 结果），
//! 日志目录可用时另外按天滚动写入文件。

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// 默认日志过滤
const DEFAULT_FILTER: &str = "shootsync=info,shootsync_lib=info,shootsync_core=info";

/// 初始化全局日志
///
/// 返回的 guard 必须在进程生命周期内保持存活，否则文件日志会丢失尾部。
pub fn init_logging(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let mut guard = None;
    let file_layer = log_dir.and_then(|dir| match std::fs::create_dir_all(&dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(dir, "shootsync.log");
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(env_filter.clone()),
            )
        }
        Err(e) => {
            eprintln!("无法创建日志目录 {}: {}", dir.display(), e);
            None
        }
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    // 测试或重复初始化时忽略错误
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    guard
}
