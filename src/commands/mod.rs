//! 命令模块
//!
//! 每个命令返回 `Result<T, CommandError>`，可直接序列化给调用方

pub mod catalog;
pub mod scanner;

pub use catalog::{get_database_stats, prune_shoots};
pub use scanner::{cancel_scan, get_scan_status, reset_scan_status, start_full_scan};
