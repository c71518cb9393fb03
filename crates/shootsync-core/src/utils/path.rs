//! 路径解析与文件名净化工具

use std::path::{Component, Path, PathBuf};

/// 将路径解析为绝对路径（纯词法处理）
///
/// 相对路径以当前工作目录为基准；`.` 被丢弃，`..` 回退一级。
/// 不访问文件系统，也不跟随符号链接。
pub fn resolve_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// 计算 `path` 相对于 `root` 的路径，统一使用 `/` 分隔
///
/// 两侧都先经过 [`resolve_path`]，因此结果与调用方传入的写法无关。
/// `path` 不在 `root` 之下时返回 `None`。
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let root = resolve_path(root);
    let path = resolve_path(path);
    let rel = path.strip_prefix(&root).ok()?;

    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// 将文件名的一部分净化为可安全落盘的名称
pub fn sanitize_filename_component(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return "media".to_string();
    }

    let mut out = String::with_capacity(trimmed.len().min(180));
    for c in trimmed.chars() {
        let forbidden = matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || c.is_control();
        out.push(if forbidden { '_' } else { c });
        if out.len() >= 180 {
            break;
        }
    }

    let out = out.trim_matches([' ', '.']).to_string();
    if out.is_empty() {
        "media".to_string()
    } else {
        out
    }
}
