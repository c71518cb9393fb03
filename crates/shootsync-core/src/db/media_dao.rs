//! 媒体数据访问层

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{now_iso8601, Media, NewMedia, UpsertOutcome, Upserted};
use crate::utils::error::AppResult;

use super::connection::Database;

const MEDIA_COLUMNS: &str = r#"
    media_id, filepath, filesize, content_hash, width, height, duration,
    mime_type, file_created_at, file_modified_at, shoot_id, thumbnail_path,
    created_at, updated_at
"#;

/// 从数据库行映射到 Media 结构
fn row_to_media(row: &Row<'_>) -> rusqlite::Result<Media> {
    Ok(Media {
        media_id: row.get("media_id")?,
        filepath: row.get("filepath")?,
        filesize: row.get("filesize")?,
        content_hash: row.get("content_hash")?,
        width: row.get("width")?,
        height: row.get("height")?,
        duration: row.get("duration")?,
        mime_type: row.get("mime_type")?,
        file_created_at: row.get("file_created_at")?,
        file_modified_at: row.get("file_modified_at")?,
        shoot_id: row.get("shoot_id")?,
        thumbnail_path: row.get("thumbnail_path")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn find_by_filepath(conn: &Connection, filepath: &str) -> rusqlite::Result<Option<Media>> {
    conn.query_row(
        &format!("SELECT {} FROM media WHERE filepath = ?1", MEDIA_COLUMNS),
        params![filepath],
        row_to_media,
    )
    .optional()
}

fn find_by_id(conn: &Connection, media_id: i64) -> rusqlite::Result<Media> {
    conn.query_row(
        &format!("SELECT {} FROM media WHERE media_id = ?1", MEDIA_COLUMNS),
        params![media_id],
        row_to_media,
    )
}

fn insert(conn: &Connection, media: &NewMedia) -> rusqlite::Result<Media> {
    let now = now_iso8601();
    conn.execute(
        r#"
        INSERT INTO media (
            filepath, filesize, content_hash, width, height, duration,
            mime_type, file_created_at, file_modified_at, shoot_id,
            thumbnail_path, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        "#,
        params![
            media.filepath,
            media.filesize,
            media.content_hash,
            media.width,
            media.height,
            media.duration,
            media.mime_type,
            media.file_created_at,
            media.file_modified_at,
            media.shoot_id,
            media.thumbnail_path,
            now,
        ],
    )?;
    find_by_id(conn, conn.last_insert_rowid())
}

fn update(conn: &Connection, media_id: i64, media: &NewMedia) -> rusqlite::Result<Media> {
    conn.execute(
        r#"
        UPDATE media SET
            filepath = ?1, filesize = ?2, content_hash = ?3, width = ?4,
            height = ?5, duration = ?6, mime_type = ?7, file_created_at = ?8,
            file_modified_at = ?9, shoot_id = ?10, thumbnail_path = ?11,
            updated_at = ?12
        WHERE media_id = ?13
        "#,
        params![
            media.filepath,
            media.filesize,
            media.content_hash,
            media.width,
            media.height,
            media.duration,
            media.mime_type,
            media.file_created_at,
            media.file_modified_at,
            media.shoot_id,
            media.thumbnail_path,
            now_iso8601(),
            media_id,
        ],
    )?;
    find_by_id(conn, media_id)
}

impl Database {
    // ==================== Media CRUD ====================

    /// 插入媒体记录
    pub fn insert_media(&self, media: &NewMedia) -> AppResult<Media> {
        let conn = self.connection()?;
        Ok(insert(&conn, &media.normalized())?)
    }

    /// 更新媒体记录（整行覆盖）
    pub fn update_media(&self, media_id: i64, media: &NewMedia) -> AppResult<Media> {
        let conn = self.connection()?;
        Ok(update(&conn, media_id, &media.normalized())?)
    }

    /// 根据相对路径获取媒体
    pub fn get_media_by_filepath(&self, filepath: &str) -> AppResult<Option<Media>> {
        let conn = self.connection()?;
        Ok(find_by_filepath(&conn, filepath)?)
    }

    /// 获取全部媒体
    pub fn get_all_media(&self) -> AppResult<Vec<Media>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM media ORDER BY media_id",
            MEDIA_COLUMNS
        ))?;
        let media = stmt
            .query_map([], row_to_media)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(media)
    }

    /// 获取全部 (media_id, filepath)，清理阶段使用
    pub fn get_media_filepaths(&self) -> AppResult<Vec<(i64, String)>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT media_id, filepath FROM media ORDER BY media_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 批量删除媒体记录（单个事务），返回删除数量
    pub fn delete_media_by_ids(&self, ids: &[i64]) -> AppResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.transaction(|conn| {
            let mut stmt = conn.prepare("DELETE FROM media WHERE media_id = ?1")?;
            let mut deleted = 0;
            for id in ids {
                deleted += stmt.execute(params![id])?;
            }
            Ok(deleted)
        })
    }

    /// 按 filepath 插入或更新媒体
    ///
    /// 字段（不含 ID 与时间戳）完全一致时不写入，`updated_at` 保持不变。
    pub fn upsert_media(&self, media: &NewMedia) -> AppResult<Upserted<Media>> {
        let candidate = media.normalized();

        self.transaction(|conn| {
            let upserted = match find_by_filepath(conn, &candidate.filepath)? {
                None => Upserted {
                    outcome: UpsertOutcome::Created,
                    record: insert(conn, &candidate)?,
                },
                Some(existing) if candidate.same_as(&existing) => Upserted {
                    outcome: UpsertOutcome::Unchanged,
                    record: existing,
                },
                Some(existing) => Upserted {
                    outcome: UpsertOutcome::Updated,
                    record: update(conn, existing.media_id, &candidate)?,
                },
            };
            Ok(upserted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn sample(filepath: &str) -> NewMedia {
        NewMedia {
            filepath: filepath.to_string(),
            filesize: 1024,
            content_hash: "deadbeef".to_string(),
            width: 800,
            height: 600,
            duration: None,
            mime_type: "image/jpeg".to_string(),
            file_created_at: "2024-01-15T10:00:00.000Z".to_string(),
            file_modified_at: "2024-01-15T10:00:00.000Z".to_string(),
            shoot_id: None,
            thumbnail_path: Some("/thumbs/a_thumb.jpg".to_string()),
        }
    }

    #[test]
    fn test_upsert_created_unchanged_updated() {
        let db = setup_db();
        let media = sample("2024-01-15_Beach/a.jpg");

        let first = db.upsert_media(&media).unwrap();
        assert_eq!(first.outcome, UpsertOutcome::Created);
        assert!(first.record.media_id > 0);

        // 强制把 updated_at 改成旧值，确认 Unchanged 不会写入
        {
            let conn = db.connection().unwrap();
            conn.execute(
                "UPDATE media SET updated_at = 'stale' WHERE media_id = ?1",
                params![first.record.media_id],
            )
            .unwrap();
        }

        let second = db.upsert_media(&media).unwrap();
        assert_eq!(second.outcome, UpsertOutcome::Unchanged);
        assert_eq!(second.record.updated_at, "stale");
        assert_eq!(second.record.media_id, first.record.media_id);

        let changed = NewMedia {
            content_hash: "cafebabe".to_string(),
            ..media
        };
        let third = db.upsert_media(&changed).unwrap();
        assert_eq!(third.outcome, UpsertOutcome::Updated);
        assert_eq!(third.record.content_hash, "cafebabe");
        assert_ne!(third.record.updated_at, "stale");
        assert_eq!(third.record.media_id, first.record.media_id);
    }

    #[test]
    fn test_upsert_empty_thumbnail_matches_null() {
        let db = setup_db();
        let media = NewMedia {
            thumbnail_path: None,
            ..sample("a.jpg")
        };
        db.upsert_media(&media).unwrap();

        let with_empty = NewMedia {
            thumbnail_path: Some(String::new()),
            ..media
        };
        let again = db.upsert_media(&with_empty).unwrap();
        assert_eq!(again.outcome, UpsertOutcome::Unchanged);
    }

    #[test]
    fn test_delete_media_by_ids() {
        let db = setup_db();
        let a = db.insert_media(&sample("A.jpg")).unwrap();
        let b = db.insert_media(&sample("B.jpg")).unwrap();
        let c = db.insert_media(&sample("C.jpg")).unwrap();

        assert_eq!(db.delete_media_by_ids(&[b.media_id]).unwrap(), 1);
        assert_eq!(db.delete_media_by_ids(&[]).unwrap(), 0);

        let remaining: Vec<String> = db
            .get_media_filepaths()
            .unwrap()
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        assert_eq!(remaining, vec!["A.jpg".to_string(), "C.jpg".to_string()]);
        assert!(db.get_media_by_filepath("B.jpg").unwrap().is_none());
        assert_eq!(
            db.get_media_by_filepath("C.jpg").unwrap().unwrap().media_id,
            c.media_id
        );
        assert_eq!(db.get_all_media().unwrap()[0].media_id, a.media_id);
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        let db = setup_db();
        let media = NewMedia {
            width: 0,
            ..sample("zero.jpg")
        };
        assert!(db.insert_media(&media).is_err());
    }
}
