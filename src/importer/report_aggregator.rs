// ==========================================
// 认证证据导入 - 报告汇总器
// ==========================================
// 职责: 合并分类结果与提交结果，生成导入报告与汇总统计
// 约束: 纯函数；报告不变量只在此处保证
// ==========================================

use crate::domain::import_report::{
    Classification, ClassifiedRecord, CommitOutcome, CommitStatus, DuplicateRecord, ImportPreview,
    ImportReport, ImportSummary, InvalidRecord,
};
use tracing::error;

pub struct ReportAggregator;

/// 按分类拆分：(合格数, 无效明细, 重复明细)，明细按行号升序
fn partition(classified: Vec<ClassifiedRecord>) -> (usize, Vec<InvalidRecord>, Vec<DuplicateRecord>) {
    let mut valid_count = 0;
    let mut invalid_records = Vec::new();
    let mut duplicate_records = Vec::new();

    for item in classified {
        match item.classification {
            Classification::Valid => valid_count += 1,
            Classification::Invalid {
                errors,
                duplicate_of,
            } => invalid_records.push(InvalidRecord {
                record: item.record,
                errors,
                duplicate_of,
            }),
            Classification::Duplicate(conflict) => duplicate_records.push(DuplicateRecord {
                record: item.record,
                conflict,
            }),
        }
    }

    invalid_records.sort_by_key(|r| r.record.row_index);
    duplicate_records.sort_by_key(|r| r.record.row_index);
    (valid_count, invalid_records, duplicate_records)
}

impl ReportAggregator {
    pub fn aggregate(
        batch_id: String,
        classified: Vec<ClassifiedRecord>,
        mut commit_outcomes: Vec<CommitOutcome>,
        cancelled: bool,
        elapsed_ms: u64,
    ) -> ImportReport {
        let total_rows = classified.len();
        let (valid_count, invalid_records, duplicate_records) = partition(classified);
        commit_outcomes.sort_by_key(|o| o.row_index);

        let mut summary = ImportSummary {
            total_rows,
            valid: valid_count,
            invalid: invalid_records.len(),
            duplicate: duplicate_records.len(),
            ..Default::default()
        };
        for outcome in &commit_outcomes {
            match outcome.status {
                CommitStatus::Committed => summary.committed += 1,
                CommitStatus::Failed { .. } => summary.failed += 1,
                CommitStatus::NotProcessed => summary.not_processed += 1,
            }
        }

        let report = ImportReport {
            batch_id,
            total_rows,
            valid_count,
            invalid_records,
            duplicate_records,
            commit_outcomes,
            summary,
            cancelled,
            elapsed_ms,
        };

        if let Err(violation) = report.check_invariants() {
            error!(batch_id = %report.batch_id, ?violation, "导入报告不变量不成立");
        }

        report
    }

    /// 试运行汇总（无提交阶段）
    pub fn preview(classified: Vec<ClassifiedRecord>) -> ImportPreview {
        let total_rows = classified.len();
        let (valid_count, invalid_records, duplicate_records) = partition(classified);
        ImportPreview {
            total_rows,
            valid_count,
            invalid_records,
            duplicate_records,
        }
    }
}
