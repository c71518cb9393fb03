//! 拍摄数据访问层

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{now_iso8601, NewShoot, Shoot, ShootMatch, UpsertOutcome, Upserted};
use crate::utils::error::{AppError, AppResult};

use super::connection::Database;

const SHOOT_COLUMNS: &str = "shoot_id, name, shoot_date, folder_path, created_at, updated_at";

/// 从数据库行映射到 Shoot 结构
fn row_to_shoot(row: &Row<'_>) -> rusqlite::Result<Shoot> {
    Ok(Shoot {
        shoot_id: row.get("shoot_id")?,
        name: row.get("name")?,
        shoot_date: row.get("shoot_date")?,
        folder_path: row.get("folder_path")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn find_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Shoot>> {
    // name 不唯一，同名时取最早的一条
    conn.query_row(
        &format!(
            "SELECT {} FROM shoots WHERE name = ?1 ORDER BY shoot_id LIMIT 1",
            SHOOT_COLUMNS
        ),
        params![name],
        row_to_shoot,
    )
    .optional()
}

fn find_by_folder_path(conn: &Connection, folder_path: &str) -> rusqlite::Result<Option<Shoot>> {
    conn.query_row(
        &format!("SELECT {} FROM shoots WHERE folder_path = ?1", SHOOT_COLUMNS),
        params![folder_path],
        row_to_shoot,
    )
    .optional()
}

fn find_by_id(conn: &Connection, shoot_id: i64) -> rusqlite::Result<Shoot> {
    conn.query_row(
        &format!("SELECT {} FROM shoots WHERE shoot_id = ?1", SHOOT_COLUMNS),
        params![shoot_id],
        row_to_shoot,
    )
}

fn insert(conn: &Connection, shoot: &NewShoot) -> rusqlite::Result<Shoot> {
    let now = now_iso8601();
    conn.execute(
        r#"
        INSERT INTO shoots (name, shoot_date, folder_path, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
        params![shoot.name, shoot.shoot_date, shoot.folder_path, now],
    )?;
    find_by_id(conn, conn.last_insert_rowid())
}

fn update(conn: &Connection, shoot_id: i64, shoot: &NewShoot) -> rusqlite::Result<Shoot> {
    conn.execute(
        r#"
        UPDATE shoots SET name = ?1, shoot_date = ?2, folder_path = ?3, updated_at = ?4
        WHERE shoot_id = ?5
        "#,
        params![
            shoot.name,
            shoot.shoot_date,
            shoot.folder_path,
            now_iso8601(),
            shoot_id
        ],
    )?;
    find_by_id(conn, shoot_id)
}

impl Database {
    // ==================== Shoot CRUD ====================

    /// 插入拍摄记录
    pub fn insert_shoot(&self, shoot: &NewShoot) -> AppResult<Shoot> {
        let conn = self.connection()?;
        Ok(insert(&conn, &shoot.normalized())?)
    }

    /// 更新拍摄记录
    pub fn update_shoot(&self, shoot_id: i64, shoot: &NewShoot) -> AppResult<Shoot> {
        let conn = self.connection()?;
        Ok(update(&conn, shoot_id, &shoot.normalized())?)
    }

    /// 根据名称获取拍摄（同名时返回最早创建的）
    pub fn get_shoot_by_name(&self, name: &str) -> AppResult<Option<Shoot>> {
        let conn = self.connection()?;
        Ok(find_by_name(&conn, name)?)
    }

    /// 根据拍摄目录获取拍摄
    pub fn get_shoot_by_folder_path(&self, folder_path: &str) -> AppResult<Option<Shoot>> {
        let conn = self.connection()?;
        Ok(find_by_folder_path(&conn, folder_path)?)
    }

    /// 获取全部拍摄
    pub fn get_all_shoots(&self) -> AppResult<Vec<Shoot>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shoots ORDER BY shoot_date DESC, shoot_id",
            SHOOT_COLUMNS
        ))?;
        let shoots = stmt
            .query_map([], row_to_shoot)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(shoots)
    }

    /// 批量删除拍摄记录，返回删除数量
    ///
    /// 关联媒体的 shoot_id 由外键置空。
    pub fn delete_shoots_by_ids(&self, ids: &[i64]) -> AppResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.transaction(|conn| {
            let mut stmt = conn.prepare("DELETE FROM shoots WHERE shoot_id = ?1")?;
            let mut deleted = 0;
            for id in ids {
                deleted += stmt.execute(params![id])?;
            }
            Ok(deleted)
        })
    }

    /// 插入或更新拍摄
    ///
    /// `by` 决定按名称还是按拍摄目录查找已有记录。
    pub fn upsert_shoot(&self, shoot: &NewShoot, by: ShootMatch) -> AppResult<Upserted<Shoot>> {
        let candidate = shoot.normalized();

        self.transaction(|conn| {
            let existing = match by {
                ShootMatch::Name => find_by_name(conn, &candidate.name)?,
                ShootMatch::FolderPath => {
                    let folder_path = candidate.folder_path.as_deref().ok_or_else(|| {
                        AppError::InvalidPath(format!(
                            "拍摄 {} 没有目录路径，无法按目录匹配",
                            candidate.name
                        ))
                    })?;
                    find_by_folder_path(conn, folder_path)?
                }
            };

            let upserted = match existing {
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
                    record: update(conn, existing.shoot_id, &candidate)?,
                },
            };
            Ok(upserted)
        })
    }
}
