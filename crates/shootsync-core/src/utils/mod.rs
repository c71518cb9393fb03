//! ShootSync 工具模块
//!
//! 包含错误类型和路径工具

pub mod error;
pub mod path;

pub use error::*;
pub use path::*;
