// ==========================================
// ImportPipeline 集成测试
// ==========================================
// 测试目标: 验证映射 → 分类 → 提交 → 报告的完整流程与报告不变量
// ==========================================


use evidence_import::config::{CommitMode, CommitSettings, ImportProfile};
use evidence_import::domain::{Classification, CommitStatus, ValidationErrorKind};
use evidence_import::importer::{CreateResult, FnCreator, ImportError, ImportPipeline};
use evidence_import::logging;
use evidence_import::{CanonicalField, EvidenceRecord, ImportContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_helpers::{context, grid, table, RecordingCreator, HEADERS};
use tokio_util::sync::CancellationToken;

fn default_pipeline() -> ImportPipeline {
    ImportPipeline::from_profile(&ImportProfile::default()).expect("default profile is valid")
}

fn concurrent_pipeline(max_concurrency: usize) -> ImportPipeline {
    let profile = ImportProfile {
        commit: CommitSettings {
            mode: CommitMode::Concurrent,
            max_concurrency,
        },
        ..ImportProfile::default()
    };
    ImportPipeline::from_profile(&profile).expect("profile is valid")
}

// ==========================================
// 场景 1: 3 行全部合法且唯一
// ==========================================
#[tokio::test]
async fn test_all_valid_rows_are_committed() {
    logging::init_test();

    let input = table(
        &HEADERS,
        &[
            &["01", "办学定位", "20", "ACTIVE"],
            &["02", "师资队伍", "30", "ACTIVE"],
            &["03", "教学资源", "50", "DRAFT"],
        ],
    );
    let creator = RecordingCreator::new();

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.valid_count, 3);
    assert!(report.invalid_records.is_empty());
    assert!(report.duplicate_records.is_empty());
    assert_eq!(report.attempted_count(), 3);
    assert_eq!(report.summary.committed, 3);
    assert_eq!(creator.called_codes(), vec!["01", "02", "03"]);
    assert!(!report.cancelled);
    assert!(report.check_invariants().is_ok());
}

// ==========================================
// 场景 2: 第 1、3 行编号相同
// ==========================================
#[tokio::test]
async fn test_intra_batch_duplicate_references_first_row() {
    logging::init_test();

    let input = table(
        &HEADERS,
        &[
            &["05", "课程体系", "10", "ACTIVE"],
            &["06", "实践教学", "10", "ACTIVE"],
            &["05", "课程体系（重复）", "10", "ACTIVE"],
        ],
    );
    let creator = RecordingCreator::new();

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.duplicate_records.len(), 1);
    let dup = &report.duplicate_records[0];
    assert_eq!(dup.record.row_index, 3);
    assert_eq!(dup.conflict.first_row_index, 1);
    assert_eq!(dup.conflict.key, "05");
    assert_eq!(report.attempted_count(), 2);
    assert_eq!(creator.called_rows(), vec![1, 2]);
    assert!(report.check_invariants().is_ok());
}

// ==========================================
// 场景 3: 编号格式错误 + 权重越界 → 一条记录两个错误
// ==========================================
#[tokio::test]
async fn test_multiple_rule_failures_are_all_reported() {
    logging::init_test();

    let input = table(&HEADERS, &[&["1A", "质量保障", "150", "ACTIVE"]]);
    let creator = RecordingCreator::new();

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.invalid_records.len(), 1);
    let errors = &report.invalid_records[0].errors;
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].field, CanonicalField::Code);
    assert!(matches!(
        errors[0].kind,
        ValidationErrorKind::PatternMismatch { .. }
    ));
    assert_eq!(errors[1].field, CanonicalField::Weight);
    assert!(matches!(errors[1].kind, ValidationErrorKind::OutOfRange { .. }));
    assert_eq!(report.attempted_count(), 0);
    assert!(creator.calls().is_empty());
}

// ==========================================
// 场景 4: 仅第 2 行创建失败
// ==========================================
#[tokio::test]
async fn test_commit_failure_is_isolated_to_its_row() {
    logging::init_test();

    let input = table(
        &HEADERS,
        &[
            &["01", "A", "10", "ACTIVE"],
            &["02", "B", "10", "ACTIVE"],
            &["03", "C", "10", "ACTIVE"],
        ],
    );
    let creator = RecordingCreator::new().fail_row(2, "编号 02 已存在");

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.commit_outcomes.len(), 3);
    assert!(report.commit_outcomes[0].success());
    assert!(!report.commit_outcomes[1].success());
    assert_eq!(report.commit_outcomes[1].error(), Some("编号 02 已存在"));
    assert!(report.commit_outcomes[2].success());
    assert_eq!(report.summary.failed, 1);
    assert!(report.check_invariants().is_ok());
}

// ==========================================
// 场景 5: 只有表头
// ==========================================
#[tokio::test]
async fn test_header_only_yields_empty_report() {
    logging::init_test();

    let creator = RecordingCreator::new();

    let report = default_pipeline()
        .run_grid(grid(&[&HEADERS]), &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_rows, 0);
    assert_eq!(report.valid_count, 0);
    assert!(report.commit_outcomes.is_empty());
    assert!(report.check_invariants().is_ok());
}

// ==========================================
// 场景 6: 提交 1/3 后取消
// ==========================================
#[tokio::test]
async fn test_cancel_after_first_commit_marks_rest_not_processed() {
    logging::init_test();

    let input = table(
        &HEADERS,
        &[
            &["01", "A", "10", "ACTIVE"],
            &["02", "B", "10", "ACTIVE"],
            &["03", "C", "10", "ACTIVE"],
        ],
    );
    let cancel = CancellationToken::new();
    let creator = RecordingCreator::new().cancel_after(1, cancel.clone());

    let report = default_pipeline()
        .run(input, &context(), &creator, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.commit_outcomes.len(), report.valid_count);
    assert_eq!(report.commit_outcomes[0].status, CommitStatus::Committed);
    assert_eq!(report.commit_outcomes[1].status, CommitStatus::NotProcessed);
    assert_eq!(report.commit_outcomes[2].status, CommitStatus::NotProcessed);
    assert_eq!(report.summary.committed, 1);
    assert_eq!(report.summary.not_processed, 2);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(creator.calls().len(), 1);
    assert!(report.check_invariants().is_ok());
}

// ==========================================
// 结构性错误
// ==========================================
#[tokio::test]
async fn test_empty_input_is_structural_error() {
    let creator = RecordingCreator::new();

    let err = default_pipeline()
        .run_grid(Vec::new(), &context(), &creator, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::EmptyInput));
    assert!(err.is_structural());
}

#[tokio::test]
async fn test_blank_header_row_is_structural_error() {
    let creator = RecordingCreator::new();

    let err = default_pipeline()
        .run_grid(
            grid(&[&["", " "], &["01", "A"]]),
            &context(),
            &creator,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MissingHeaderRow));
    assert!(creator.calls().is_empty());
}

// ==========================================
// 映射行为
// ==========================================
#[tokio::test]
async fn test_mixed_language_headers_and_unknown_columns() {
    logging::init_test();

    let input = table(
        &["Código", "Notas internas", "Name", "Ponderación", "Estado"],
        &[&["07", "ignorar", "Vinculación", "12,5", "INACTIVE"]],
    );
    let creator = RecordingCreator::new();

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.summary.committed, 1);
    let committed = &creator.calls()[0];
    assert_eq!(committed.value(CanonicalField::Name), Some("Vinculación"));
    assert_eq!(committed.value(CanonicalField::Weight), Some("12,5"));
    assert_eq!(committed.value(CanonicalField::Status), Some("INACTIVE"));
}

#[tokio::test]
async fn test_blank_rows_are_skipped_and_indices_preserved() {
    let input = table(
        &HEADERS,
        &[
            &["01", "A", "", ""],
            &["", "", "", ""],
            &["03", "", "", ""],
        ],
    );
    let creator = RecordingCreator::new();

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total_rows, 2);
    assert_eq!(report.invalid_records[0].record.row_index, 3);
    assert_eq!(report.invalid_records[0].errors[0].kind, ValidationErrorKind::Required);
}

// ==========================================
// 分类优先级与去重规则
// ==========================================
#[tokio::test]
async fn test_invalid_duplicate_carries_both_facts_and_is_not_committed() {
    let input = table(
        &HEADERS,
        &[&["09", "A", "10", "ACTIVE"], &["09", "B", "500", "ACTIVE"]],
    );
    let creator = RecordingCreator::new();

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.valid_count, 1);
    assert!(report.duplicate_records.is_empty());
    let invalid = &report.invalid_records[0];
    assert_eq!(invalid.record.row_index, 2);
    assert_eq!(invalid.duplicate_of.as_ref().map(|d| d.first_row_index), Some(1));
    assert_eq!(creator.called_rows(), vec![1]);
}

#[test]
fn test_duplicate_tie_break_ignores_input_order() {
    // 行号乱序输入：行号小者始终为首次出现
    let mut input = table(
        &HEADERS,
        &[&["11", "A", "", ""], &["11", "B", "", ""], &["11", "C", "", ""]],
    );
    input.rows.reverse();

    let classified = default_pipeline().classify(&input).unwrap();

    assert_eq!(classified[0].record.row_index, 1);
    assert!(classified[0].classification.is_valid());
    for item in &classified[1..] {
        match &item.classification {
            Classification::Duplicate(conflict) => assert_eq!(conflict.first_row_index, 1),
            other => panic!("unexpected classification: {:?}", other),
        }
    }
}

#[test]
fn test_classification_is_idempotent() {
    let input = table(
        &HEADERS,
        &[&["1", "A", "x", "ACTIVE"], &["1", "B", "5", "active"], &["2", "", "5", ""]],
    );
    let pipeline = default_pipeline();

    assert_eq!(
        pipeline.classify(&input).unwrap(),
        pipeline.classify(&input).unwrap()
    );
}

// ==========================================
// 提交阶段
// ==========================================
#[tokio::test]
async fn test_panicking_creator_is_captured_as_failure() {
    logging::init_test();

    let input = table(&HEADERS, &[&["01", "A", "", ""], &["02", "B", "", ""]]);
    let creator = RecordingCreator::new().panic_row(1);

    let report = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.commit_outcomes[0]
        .error()
        .unwrap()
        .contains("creator crashed on row 1"));
    assert!(report.commit_outcomes[1].success());
    assert!(report.check_invariants().is_ok());
}

#[tokio::test]
async fn test_concurrent_commit_reports_in_source_order() {
    logging::init_test();

    let input = table(
        &HEADERS,
        &[
            &["01", "A", "", ""],
            &["02", "B", "", ""],
            &["03", "C", "", ""],
            &["04", "D", "", ""],
        ],
    );
    // 先开始的行更晚完成
    let creator = RecordingCreator::new()
        .delay_row(1, 40)
        .delay_row(2, 20)
        .fail_row(3, "store rejected");

    let report = concurrent_pipeline(4)
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    let rows: Vec<usize> = report.commit_outcomes.iter().map(|o| o.row_index).collect();
    assert_eq!(rows, vec![1, 2, 3, 4]);
    assert_eq!(report.commit_outcomes[2].error(), Some("store rejected"));
    assert_eq!(report.summary.committed, 3);
    assert!(report.check_invariants().is_ok());
}

#[tokio::test]
async fn test_closure_creator() {
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = counter.clone();
    let creator = FnCreator(move |_ctx: ImportContext, record: EvidenceRecord| {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            let result: CreateResult = if record.value(CanonicalField::Code) == Some("02") {
                Err("rejected".into())
            } else {
                Ok(())
            };
            result
        }
    });

    let report = default_pipeline()
        .run(
            table(&HEADERS, &[&["01", "A", "", ""], &["02", "B", "", ""]]),
            &context(),
            &creator,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(report.summary.failed, 1);
}

#[tokio::test]
async fn test_each_run_is_independent() {
    let input = table(&HEADERS, &[&["01", "A", "", ""], &["02", "B", "", ""]]);
    let pipeline = default_pipeline();
    let creator = RecordingCreator::new();

    let first = pipeline
        .run(input.clone(), &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();
    let second = pipeline
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap();

    assert_ne!(first.batch_id, second.batch_id);
    assert_eq!(first.summary, second.summary);
    assert_eq!(creator.calls().len(), 4);
}

#[tokio::test]
async fn test_repeated_row_index_aborts_before_commit() {
    let mut input = table(&HEADERS, &[&["01", "A", "", ""], &["02", "B", "", ""]]);
    input.rows[1].row_index = 1;
    let creator = RecordingCreator::new();

    let err = default_pipeline()
        .run(input, &context(), &creator, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::InvalidRowIndex(1)));
    assert!(err.is_structural());
    assert!(creator.calls().is_empty());
}
