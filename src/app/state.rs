// ==========================================
// 认证证据导入 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享资源和API实例
// ==========================================

use std::sync::Arc;

use crate::api::{ApiResult, ImportApi};
use crate::config::ImportProfile;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "EVIDENCE_IMPORT_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建应用状态
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - profile_id: 已存储的导入配置档 ID（可选）
    /// - profile: 直接给定的导入配置档（可选，优先）
    pub fn new(
        db_path: String,
        profile_id: Option<String>,
        profile: Option<ImportProfile>,
    ) -> ApiResult<Self> {
        tracing::debug!(db_path = %db_path, "初始化应用状态");

        let mut import_api = ImportApi::new(&db_path)?;
        if let Some(id) = profile_id {
            import_api = import_api.with_profile_id(id);
        }
        if let Some(profile) = profile {
            import_api = import_api.with_profile(profile);
        }

        Ok(Self {
            db_path,
            import_api: Arc::new(import_api),
        })
    }
}

/// 获取默认数据库路径
///
/// # 逻辑
/// 1. 环境变量 EVIDENCE_IMPORT_DB_PATH
/// 2. 用户数据目录下的 evidence-import/evidence_import.db
/// 3. 当前目录 ./evidence_import.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./evidence_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("evidence-import");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("evidence_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
