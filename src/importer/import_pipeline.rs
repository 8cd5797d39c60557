// ==========================================
// 认证证据导入 - 导入管道
// ==========================================
// 职责: 串联各阶段，从原始表格到导入报告
// 流程: 表头映射 → 校验 + 批内去重（分类）→ 提交（仅 Valid）→ 报告汇总
// 错误: 只有结构性错误（空输入 / 缺表头）中止整批；其余全部进入报告
// ==========================================

use crate::config::import_profile::ImportProfile;
use crate::domain::evidence::{CanonicalField, EvidenceRecord, ImportContext, RawTable};
use crate::domain::import_report::{Classification, ClassifiedRecord, ImportPreview, ImportReport};
use crate::importer::batch_committer::BatchCommitter;
use crate::importer::duplicate_detector::DuplicateDetector as DuplicateDetectorImpl;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::evidence_importer_trait::{
    DuplicateDetector, HeaderMapper, RecordCreator, RecordValidator,
};
use crate::importer::header_mapper::HeaderMapper as HeaderMapperImpl;
use crate::importer::record_validator::RecordValidator as RecordValidatorImpl;
use crate::importer::report_aggregator::ReportAggregator;
use crate::perf::PerfGuard;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ImportPipeline - 证据导入管道
// ==========================================
pub struct ImportPipeline {
    // 导入组件（构造后只读，可跨批次复用）
    header_mapper: Box<dyn HeaderMapper>,
    record_validator: Box<dyn RecordValidator>,
    duplicate_detector: Box<dyn DuplicateDetector>,
    batch_committer: BatchCommitter,

    // 批内唯一键字段
    key_field: CanonicalField,
}

impl ImportPipeline {
    pub fn new(
        header_mapper: Box<dyn HeaderMapper>,
        record_validator: Box<dyn RecordValidator>,
        duplicate_detector: Box<dyn DuplicateDetector>,
        batch_committer: BatchCommitter,
        key_field: CanonicalField,
    ) -> Self {
        Self {
            header_mapper,
            record_validator,
            duplicate_detector,
            batch_committer,
            key_field,
        }
    }

    /// 按导入配置装配默认组件
    pub fn from_profile(profile: &ImportProfile) -> ImportResult<Self> {
        profile.validate()?;

        Ok(Self::new(
            Box::new(HeaderMapperImpl::new(profile)),
            Box::new(RecordValidatorImpl::from_profile(profile)?),
            Box::new(DuplicateDetectorImpl),
            BatchCommitter::new(profile.commit),
            profile.key_field,
        ))
    }

    /// 分类阶段（纯计算，不调用创建操作）
    ///
    /// 每条非空白行恰好得到一个分类，按行号升序返回。
    pub fn classify(&self, table: &RawTable) -> ImportResult<Vec<ClassifiedRecord>> {
        if table.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ImportError::MissingHeaderRow);
        }

        check_row_indices(table)?;

        let mapping = self.header_mapper.map(&table.headers);
        let mapped_columns = mapping.iter().filter(|m| m.is_mapped()).count();
        if mapped_columns == 0 {
            warn!(headers = ?table.headers, "表头无任何可识别列，所有行将因必填项缺失而无效");
        }

        let mut records = self.header_mapper.apply(&mapping, &table.rows);
        records.sort_by_key(|r| r.row_index);

        // 重复检测与校验相互独立：无效的首次出现同样占用唯一键
        let mut duplicates = self.duplicate_detector.detect(&records, self.key_field);

        let classified = records
            .into_iter()
            .map(|record| {
                let errors = self.record_validator.validate(&record);
                let duplicate_of = duplicates.remove(&record.row_index);
                let classification = match (errors.is_empty(), duplicate_of) {
                    (false, duplicate_of) => Classification::Invalid {
                        errors,
                        duplicate_of,
                    },
                    (true, Some(conflict)) => Classification::Duplicate(conflict),
                    (true, None) => Classification::Valid,
                };
                ClassifiedRecord {
                    record,
                    classification,
                }
            })
            .collect();

        Ok(classified)
    }

    /// 试运行：只映射与分类，不调用创建操作
    pub fn preview(&self, table: &RawTable) -> ImportResult<ImportPreview> {
        let classified = self.classify(table)?;
        Ok(ReportAggregator::preview(classified))
    }

    /// 执行一次完整导入
    ///
    /// # 返回
    /// - Ok(ImportReport): 完整报告（含逐行问题与提交结果）
    /// - Err: 仅结构性错误
    #[instrument(skip_all, fields(batch_id, standard_id = %context.standard_id))]
    pub async fn run(
        &self,
        table: RawTable,
        context: &ImportContext,
        creator: &dyn RecordCreator,
        cancel: &CancellationToken,
    ) -> ImportResult<ImportReport> {
        let perf = PerfGuard::new("import_pipeline.run");
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        info!(rows = table.rows.len(), "开始导入");

        // === 阶段 1-2: 映射 + 分类 ===
        let classified = self.classify(&table)?;
        let eligible: Vec<EvidenceRecord> = classified
            .iter()
            .filter(|c| c.classification.is_valid())
            .map(|c| c.record.clone())
            .collect();
        debug!(
            total = classified.len(),
            eligible = eligible.len(),
            "分类完成"
        );

        // === 阶段 3: 提交 ===
        let outcomes = self
            .batch_committer
            .commit(context, &eligible, self.key_field, creator, cancel)
            .await;
        let cancelled = cancel.is_cancelled();

        // === 阶段 4: 汇总 ===
        let report = ReportAggregator::aggregate(
            batch_id,
            classified,
            outcomes,
            cancelled,
            perf.elapsed_ms(),
        );

        info!(
            total_rows = report.summary.total_rows,
            valid = report.summary.valid,
            invalid = report.summary.invalid,
            duplicate = report.summary.duplicate,
            committed = report.summary.committed,
            failed = report.summary.failed,
            not_processed = report.summary.not_processed,
            cancelled,
            "导入完成"
        );

        Ok(report)
    }

    /// 从二维单元格直接导入（第一行为表头）
    pub async fn run_grid(
        &self,
        grid: Vec<Vec<String>>,
        context: &ImportContext,
        creator: &dyn RecordCreator,
        cancel: &CancellationToken,
    ) -> ImportResult<ImportReport> {
        let table = RawTable::from_grid(grid).ok_or(ImportError::EmptyInput)?;
        self.run(table, context, creator, cancel).await
    }
}

/// 行号须为 1 起且互不重复（重复检测与结果排序都以行号为键）
fn check_row_indices(table: &RawTable) -> ImportResult<()> {
    let mut seen = HashSet::with_capacity(table.rows.len());
    for row in &table.rows {
        if row.row_index == 0 || !seen.insert(row.row_index) {
            return Err(ImportError::InvalidRowIndex(row.row_index));
        }
    }
    Ok(())
}
