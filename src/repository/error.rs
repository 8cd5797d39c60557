// ==========================================
// 认证证据导入 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 唯一约束冲突在导入中表现为单条提交失败，不中止批次
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 同一标准下编号已存在（跨批次重复）
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RepositoryError::UniqueConstraintViolation(_))
    }
}

// 按 SQLite 扩展错误码分类（约束冲突需要区分唯一键与外键）
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi;

        match err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let msg = msg.unwrap_or_else(|| e.to_string());
                match e.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::UniqueConstraintViolation(msg)
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RepositoryError::ForeignKeyViolation(msg),
                    _ if e.code == rusqlite::ErrorCode::DatabaseBusy
                        || e.code == rusqlite::ErrorCode::DatabaseLocked =>
                    {
                        RepositoryError::LockError(msg)
                    }
                    _ => RepositoryError::DatabaseQueryError(msg),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "row".to_string(),
                id: "-".to_string(),
            },
            other => RepositoryError::DatabaseQueryError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_constraint_errors_are_classified() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id TEXT PRIMARY KEY);
             CREATE TABLE child (code TEXT UNIQUE, parent_id TEXT REFERENCES parent(id));
             INSERT INTO child (code) VALUES ('01');",
        )
        .unwrap();

        let dup: RepositoryError = conn
            .execute("INSERT INTO child (code) VALUES ('01')", [])
            .unwrap_err()
            .into();
        assert!(dup.is_unique_violation());

        let fk: RepositoryError = conn
            .execute("INSERT INTO child (code, parent_id) VALUES ('02', 'missing')", [])
            .unwrap_err()
            .into();
        assert!(matches!(fk, RepositoryError::ForeignKeyViolation(_)));

        let syntax: RepositoryError = conn.execute("SELEC 1", []).unwrap_err().into();
        assert!(matches!(syntax, RepositoryError::DatabaseQueryError(_)));
    }
}
