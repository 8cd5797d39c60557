// ==========================================
// 认证证据导入 - 领域模型层
// ==========================================
// 职责: 定义导入管道中流转的实体与分类结果
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod criterion;
pub mod evidence;
pub mod import_report;

// 重导出核心类型
pub use criterion::EvidenceCriterion;
pub use evidence::{
    CanonicalField, EvidenceRecord, FieldMapping, ImportContext, RawRow, RawTable,
};
pub use import_report::{
    Classification, ClassifiedRecord, CommitOutcome, CommitStatus, DuplicateConflict,
    DuplicateRecord, ImportPreview, ImportReport, ImportSummary, InvalidRecord, ReportInvariantError,
    ValidationError, ValidationErrorKind,
};
