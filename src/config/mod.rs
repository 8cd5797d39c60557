// ==========================================
// 认证证据导入 - 配置层
// ==========================================
// 职责: 导入配置档（同义词表/规则表/提交设置）的定义与存取
// 存储: config_kv 表 / JSON 文件
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod import_profile;

// 重导出核心配置类型
pub use config_manager::ConfigManager;
pub use import_config_trait::{ImportConfigReader, StaticConfig};
pub use import_profile::{normalize_header, CommitMode, CommitSettings, ImportProfile, RuleSpec};
