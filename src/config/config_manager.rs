// ==========================================
// 认证证据导入 - 配置管理器
// ==========================================
// 职责: 导入配置档的存取（JSON）
// 存储: config_kv 表 (scope_id='global', key='import_profile/{id}')
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::config::import_profile::ImportProfile;
use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const PROFILE_KEY_PREFIX: &str = "import_profile/";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（确保 config_kv 表存在）
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let guard = conn.lock().map_err(|e| lock_error(&e.to_string()))?;
            guard.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS config_kv (
                    scope_id TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (scope_id, key)
                );
                "#,
            )?;
        }
        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| lock_error(&e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 保存导入配置档（先校验，再 upsert）
    pub fn save_import_profile(&self, profile_id: &str, profile: &ImportProfile) -> ImportResult<()> {
        let id = profile_id.trim();
        if id.is_empty() {
            return Err(ImportError::ConfigValueError {
                key: "profile_id".to_string(),
                value: profile_id.to_string(),
                message: "配置档 ID 不能为空".to_string(),
            });
        }
        profile.validate()?;

        let json = serde_json::to_string(profile)?;
        let conn = self.conn.lock().map_err(|e| lock_error(&e.to_string()))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![format!("{}{}", PROFILE_KEY_PREFIX, id), json],
        )?;

        tracing::info!(profile_id = id, "导入配置档已保存");
        Ok(())
    }

    /// 已存储的配置档 ID 列表（按字母序）
    pub fn list_import_profile_ids(&self) -> ImportResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|e| lock_error(&e.to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT key FROM config_kv WHERE scope_id = 'global' AND key LIKE 'import_profile/%' ORDER BY key",
        )?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(PROFILE_KEY_PREFIX).map(String::from))
            .collect();

        Ok(ids)
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_import_profile(&self, profile_id: &str) -> ImportResult<Option<ImportProfile>> {
        let id = profile_id.trim();
        if id.is_empty() {
            return Ok(None);
        }

        let key = format!("{}{}", PROFILE_KEY_PREFIX, id);
        match self.get_config_value(&key)? {
            None => Ok(None),
            Some(raw) => ImportProfile::from_json_str(&raw)
                .map(Some)
                .map_err(|e| ImportError::ConfigReadError {
                    key,
                    message: e.to_string(),
                }),
        }
    }
}

fn lock_error(message: &str) -> ImportError {
    ImportError::InternalError(format!("锁获取失败: {}", message))
}
