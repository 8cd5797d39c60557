// ==========================================
// 认证证据导入 - 分类结果与导入报告
// ==========================================
// 职责: 校验错误 / 批内重复 / 分类 / 提交结果 / 导入报告
// 状态流转: 未分类 → {Valid, Invalid, Duplicate} → (仅 Valid) → {Committed, Failed, NotProcessed}
// ==========================================

use crate::domain::evidence::{CanonicalField, EvidenceRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// ValidationErrorKind - 校验错误类型
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Required,
    PatternMismatch { expected: String },
    TooLong { max: usize, actual: usize },
    NotNumeric,
    OutOfRange { min: f64, max: f64 },
    NotAllowed { allowed: Vec<String> },
}

// ==========================================
// ValidationError - 单条校验错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row_index: usize,
    pub field: CanonicalField,
    pub kind: ValidationErrorKind,
    pub message: String,
}

// ==========================================
// DuplicateConflict - 批内重复（指向首次出现的行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateConflict {
    pub first_row_index: usize,
    pub key: String,
}

// ==========================================
// Classification - 记录分类（每条记录恰好一个）
// ==========================================
// 说明: Invalid 优先于 Duplicate；两者同时成立时 Invalid 携带重复信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Classification {
    Valid,
    Invalid {
        errors: Vec<ValidationError>,
        duplicate_of: Option<DuplicateConflict>,
    },
    Duplicate(DuplicateConflict),
}

impl Classification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Classification::Valid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub record: EvidenceRecord,
    pub classification: Classification,
}

// ==========================================
// CommitOutcome - 单条提交结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitStatus {
    Committed,
    Failed { error: String },
    NotProcessed, // 取消后未尝试（不是失败）
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub row_index: usize,
    pub key: String,
    #[serde(flatten)]
    pub status: CommitStatus,
}

impl CommitOutcome {
    pub fn committed(row_index: usize, key: String) -> Self {
        Self {
            row_index,
            key,
            status: CommitStatus::Committed,
        }
    }

    pub fn failed(row_index: usize, key: String, error: impl Into<String>) -> Self {
        Self {
            row_index,
            key,
            status: CommitStatus::Failed {
                error: error.into(),
            },
        }
    }

    pub fn not_processed(row_index: usize, key: String) -> Self {
        Self {
            row_index,
            key,
            status: CommitStatus::NotProcessed,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.status, CommitStatus::Committed)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            CommitStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// 是否实际调用过创建操作
    pub fn attempted(&self) -> bool {
        !matches!(self.status, CommitStatus::NotProcessed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidRecord {
    pub record: EvidenceRecord,
    pub errors: Vec<ValidationError>,
    pub duplicate_of: Option<DuplicateConflict>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub record: EvidenceRecord,
    pub conflict: DuplicateConflict,
}

// ==========================================
// ImportSummary - 汇总统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicate: usize,
    pub committed: usize,
    pub failed: usize,
    pub not_processed: usize,
}

// ==========================================
// ImportReport - 导入报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub total_rows: usize,
    pub valid_count: usize,
    pub invalid_records: Vec<InvalidRecord>,
    pub duplicate_records: Vec<DuplicateRecord>,
    pub commit_outcomes: Vec<CommitOutcome>,
    pub summary: ImportSummary,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

// ==========================================
// ImportPreview - 试运行结果（只分类，不提交）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub total_rows: usize,
    pub valid_count: usize,
    pub invalid_records: Vec<InvalidRecord>,
    pub duplicate_records: Vec<DuplicateRecord>,
}

/// 报告不变量违反
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportInvariantError {
    #[error("行数不守恒: total={total}, valid={valid}, invalid={invalid}, duplicate={duplicate}")]
    RowCountMismatch {
        total: usize,
        valid: usize,
        invalid: usize,
        duplicate: usize,
    },

    #[error("提交结果数量不符: valid={valid}, outcomes={outcomes}")]
    OutcomeCountMismatch { valid: usize, outcomes: usize },

    #[error("提交结果未按源顺序排列 (行 {row_index})")]
    OutcomeOrder { row_index: usize },

    #[error("未取消的导入存在未处理记录: {0}")]
    UnexpectedNotProcessed(usize),

    #[error("汇总统计与明细不一致: {0}")]
    SummaryMismatch(String),
}

impl ImportReport {
    /// 校验报告不变量（供调用方断言使用）
    pub fn check_invariants(&self) -> Result<(), ReportInvariantError> {
        let invalid = self.invalid_records.len();
        let duplicate = self.duplicate_records.len();

        if self.total_rows != self.valid_count + invalid + duplicate {
            return Err(ReportInvariantError::RowCountMismatch {
                total: self.total_rows,
                valid: self.valid_count,
                invalid,
                duplicate,
            });
        }

        if self.commit_outcomes.len() != self.valid_count {
            return Err(ReportInvariantError::OutcomeCountMismatch {
                valid: self.valid_count,
                outcomes: self.commit_outcomes.len(),
            });
        }

        for pair in self.commit_outcomes.windows(2) {
            if pair[0].row_index >= pair[1].row_index {
                return Err(ReportInvariantError::OutcomeOrder {
                    row_index: pair[1].row_index,
                });
            }
        }

        let not_processed = self
            .commit_outcomes
            .iter()
            .filter(|o| o.status == CommitStatus::NotProcessed)
            .count();
        if !self.cancelled && not_processed > 0 {
            return Err(ReportInvariantError::UnexpectedNotProcessed(not_processed));
        }

        let committed = self.commit_outcomes.iter().filter(|o| o.success()).count();
        let failed = self.commit_outcomes.len() - committed - not_processed;
        let s = &self.summary;
        if s.total_rows != self.total_rows
            || s.valid != self.valid_count
            || s.invalid != invalid
            || s.duplicate != duplicate
            || s.committed != committed
            || s.failed != failed
            || s.not_processed != not_processed
        {
            return Err(ReportInvariantError::SummaryMismatch(format!("{:?}", s)));
        }

        Ok(())
    }

    /// 实际调用创建操作的次数
    pub fn attempted_count(&self) -> usize {
        self.commit_outcomes.iter().filter(|o| o.attempted()).count()
    }
}
