// ==========================================
// 认证证据导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 批量导入评估指标（表格 → 校验 → 逐条提交 → 报告）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与分类结果
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 映射 / 校验 / 去重 / 提交 / 报告
pub mod importer;

// 配置层 - 导入配置档
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能统计（SQL 计数 / 慢查询）
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享资源装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    CanonicalField, Classification, CommitOutcome, CommitStatus, EvidenceCriterion,
    EvidenceRecord, ImportContext, ImportReport, ImportSummary, RawRow, RawTable,
};

// 导入管道
pub use importer::{FnCreator, ImportError, ImportPipeline, ImportResult, RecordCreator};

// 配置
pub use config::ImportProfile;

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "认证证据导入";
