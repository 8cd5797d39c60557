// ==========================================
// 认证证据导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_profile::ImportProfile;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）、StaticConfig（内存）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 按 ID 读取导入配置档
    ///
    /// # 返回
    /// - Ok(Some(profile)): 已存储的配置档
    /// - Ok(None): 不存在
    async fn get_import_profile(&self, profile_id: &str) -> ImportResult<Option<ImportProfile>>;

    /// 解析本次导入使用的配置档
    ///
    /// # 逻辑
    /// - None → 内置默认配置
    /// - Some(id) → 读取存储的配置；不存在则报错
    async fn resolve_import_profile(&self, profile_id: Option<&str>) -> ImportResult<ImportProfile> {
        match profile_id {
            None => Ok(ImportProfile::default()),
            Some(id) => self
                .get_import_profile(id)
                .await?
                .ok_or_else(|| ImportError::ConfigReadError {
                    key: format!("import_profile/{}", id),
                    message: "配置档不存在".to_string(),
                }),
        }
    }
}

// ==========================================
// StaticConfig - 内存配置（命令行 --profile-file / ImportApi::with_profile）
// ==========================================
pub struct StaticConfig {
    profile: ImportProfile,
}

impl StaticConfig {
    pub fn new(profile: ImportProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ImportConfigReader for StaticConfig {
    async fn get_import_profile(&self, _profile_id: &str) -> ImportResult<Option<ImportProfile>> {
        Ok(Some(self.profile.clone()))
    }

    async fn resolve_import_profile(&self, _profile_id: Option<&str>) -> ImportResult<ImportProfile> {
        Ok(self.profile.clone())
    }
}
