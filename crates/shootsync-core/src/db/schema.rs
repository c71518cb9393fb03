//! 数据库 Schema 定义

/// 数据库版本
pub const SCHEMA_VERSION: i32 = 1;

/// 初始化 Schema SQL
pub const INIT_SCHEMA: &str = r#"
-- 拍摄表（name 不唯一：不同日期的目录可以同名）
CREATE TABLE IF NOT EXISTS shoots (
    shoot_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    shoot_date      TEXT NOT NULL,
    folder_path     TEXT UNIQUE,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- 媒体表
CREATE TABLE IF NOT EXISTS media (
    media_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    filepath         TEXT NOT NULL UNIQUE,
    filesize         INTEGER NOT NULL,
    content_hash     TEXT NOT NULL,
    width            INTEGER NOT NULL CHECK(width > 0),
    height           INTEGER NOT NULL CHECK(height > 0),
    duration         INTEGER,
    mime_type        TEXT NOT NULL,
    file_created_at  TEXT NOT NULL,
    file_modified_at TEXT NOT NULL,
    shoot_id         INTEGER REFERENCES shoots(shoot_id) ON DELETE SET NULL,
    thumbnail_path   TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

-- 数据库版本表
CREATE TABLE IF NOT EXISTS schema_version (
    version         INTEGER PRIMARY KEY,
    applied_at      TEXT NOT NULL
);

-- 索引
CREATE INDEX IF NOT EXISTS idx_shoots_name ON shoots(name);
CREATE INDEX IF NOT EXISTS idx_media_content_hash ON media(content_hash);
CREATE INDEX IF NOT EXISTS idx_media_shoot_id ON media(shoot_id);
"#;
