// ==========================================
// 认证证据导入 - 应用层
// ==========================================
// 职责: 装配共享资源，供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
