//! 文件哈希服务
//!
//! 计算文件内容的 SHA-256，作为内容变化的判定依据

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::utils::error::{AppError, AppResult};

/// 读取缓冲区大小
const BUFFER_SIZE: usize = 64 * 1024;

/// 文件哈希计算器
pub struct FileHasher;

impl FileHasher {
    /// 计算文件的完整哈希值（小写十六进制）
    pub fn hash_file(path: &Path) -> AppResult<String> {
        let hash_error = |source: std::io::Error| AppError::HashFile {
            path: path.display().to_string(),
            source,
        };

        let file = File::open(path).map_err(hash_error)?;
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        Self::hash_reader(&mut reader).map_err(hash_error)
    }

    /// 对任意读取源计算哈希
    pub fn hash_reader<R: Read>(reader: &mut R) -> std::io::Result<String> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(to_hex(&hasher.finalize()))
    }

    /// 比较两个文件是否相同（基于哈希）
    pub fn files_equal(path1: &Path, path2: &Path) -> AppResult<bool> {
        Ok(Self::hash_file(path1)? == Self::hash_file(path2)?)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}
