// ==========================================
// 认证证据导入 - 批量提交器实现
// ==========================================
// 职责: 逐条调用外部创建操作，逐条隔离失败
// 策略: 失败继续（continue-on-error）；不重试；不设超时
// 取消: 每条记录提交前检查，未尝试的记录标记为未处理（不是失败）
// 顺序: 结果顺序与输入顺序一致（并发模式下收集后按行号排序）
// ==========================================

use crate::config::import_profile::{CommitMode, CommitSettings};
use crate::domain::evidence::{CanonicalField, EvidenceRecord, ImportContext};
use crate::domain::import_report::{CommitOutcome, CommitStatus};
use crate::importer::evidence_importer_trait::RecordCreator;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct BatchCommitter {
    settings: CommitSettings,
}

impl BatchCommitter {
    pub fn new(settings: CommitSettings) -> Self {
        Self { settings }
    }

    pub fn sequential() -> Self {
        Self::new(CommitSettings::default())
    }

    pub fn concurrent(max_concurrency: usize) -> Self {
        Self::new(CommitSettings {
            mode: CommitMode::Concurrent,
            max_concurrency: max_concurrency.max(1),
        })
    }

    /// 提交合格记录（records 须已按源顺序排列）
    pub async fn commit(
        &self,
        context: &ImportContext,
        records: &[EvidenceRecord],
        key_field: CanonicalField,
        creator: &dyn RecordCreator,
        cancel: &CancellationToken,
    ) -> Vec<CommitOutcome> {
        let outcomes = match self.settings.mode {
            CommitMode::Sequential => {
                self.commit_sequential(context, records, key_field, creator, cancel)
                    .await
            }
            CommitMode::Concurrent => {
                self.commit_concurrent(context, records, key_field, creator, cancel)
                    .await
            }
        };

        let not_processed = outcomes
            .iter()
            .filter(|o| o.status == CommitStatus::NotProcessed)
            .count();
        if not_processed > 0 {
            info!(not_processed, "提交阶段已取消，剩余记录未处理");
        }

        outcomes
    }

    async fn commit_sequential(
        &self,
        context: &ImportContext,
        records: &[EvidenceRecord],
        key_field: CanonicalField,
        creator: &dyn RecordCreator,
        cancel: &CancellationToken,
    ) -> Vec<CommitOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());

        for record in records {
            let key = record_key(record, key_field);
            if cancel.is_cancelled() {
                outcomes.push(CommitOutcome::not_processed(record.row_index, key));
                continue;
            }
            let status = attempt(creator, context, record).await;
            outcomes.push(finish(record.row_index, key, status));
        }

        outcomes
    }

    async fn commit_concurrent(
        &self,
        context: &ImportContext,
        records: &[EvidenceRecord],
        key_field: CanonicalField,
        creator: &dyn RecordCreator,
        cancel: &CancellationToken,
    ) -> Vec<CommitOutcome> {
        let mut outcomes: Vec<CommitOutcome> = stream::iter(records)
            .map(|record| async move {
                let key = record_key(record, key_field);
                if cancel.is_cancelled() {
                    return CommitOutcome::not_processed(record.row_index, key);
                }
                let status = attempt(creator, context, record).await;
                finish(record.row_index, key, status)
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        outcomes.sort_by_key(|o| o.row_index);
        outcomes
    }
}

fn record_key(record: &EvidenceRecord, key_field: CanonicalField) -> String {
    record.value(key_field).unwrap_or_default().to_string()
}

/// 调用一次创建操作；错误与 panic 都收敛为 Failed
async fn attempt(
    creator: &dyn RecordCreator,
    context: &ImportContext,
    record: &EvidenceRecord,
) -> CommitStatus {
    match AssertUnwindSafe(creator.create(context, record))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => CommitStatus::Committed,
        Ok(Err(e)) => CommitStatus::Failed {
            error: e.to_string(),
        },
        Err(panic) => CommitStatus::Failed {
            error: format!("创建操作异常终止: {}", panic_message(panic.as_ref())),
        },
    }
}

fn finish(row_index: usize, key: String, status: CommitStatus) -> CommitOutcome {
    match &status {
        CommitStatus::Committed => debug!(row_index, key = %key, "提交成功"),
        CommitStatus::Failed { error } => warn!(row_index, key = %key, error = %error, "提交失败"),
        CommitStatus::NotProcessed => {}
    }
    CommitOutcome {
        row_index,
        key,
        status,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
