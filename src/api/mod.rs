// ==========================================
// 认证证据导入 - API 层
// ==========================================
// 职责: 提供导入业务接口,供命令行与上层应用调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse};
