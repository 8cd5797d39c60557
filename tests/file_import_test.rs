// ==========================================
// 文件导入端到端测试
// ==========================================
// 测试目标: CSV 文件 → ImportApi → SQLite → 导出 → 再导入
// ==========================================


use evidence_import::api::{ApiError, ImportApi};
use evidence_import::config::ImportProfile;
use evidence_import::domain::{CommitStatus, ImportContext};
use evidence_import::logging;
use test_helpers::{context, create_test_db, write_csv};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn api(db_path: &str) -> ImportApi {
    ImportApi::new(db_path).expect("Failed to create ImportApi")
}

#[tokio::test]
async fn test_import_csv_persists_valid_rows_and_batch() {
    logging::init_test();
    let (dir, db_path) = create_test_db();
    let file = write_csv(
        &dir,
        "criteria.csv",
        &[
            "编号,名称,权重(%),状态,备注",
            "01,办学定位,20,ACTIVE,忽略",
            "02,师资队伍,abc,ACTIVE,",
            ",,,,",
            "01,办学定位（重复）,20,ACTIVE,",
            "03,教学资源,35.5,DRAFT,",
        ],
    );
    let api = api(&db_path);

    let response = api
        .import_file(file.to_str().unwrap(), &context(), &CancellationToken::new())
        .await
        .unwrap();

    let report = &response.report;
    assert_eq!(response.source_name.as_deref(), Some("criteria.csv"));
    assert_eq!(report.total_rows, 4);
    assert_eq!(report.valid_count, 2);
    assert_eq!(report.invalid_records.len(), 1);
    assert_eq!(report.invalid_records[0].record.row_index, 2);
    assert_eq!(report.duplicate_records.len(), 1);
    assert_eq!(report.duplicate_records[0].record.row_index, 4);
    assert_eq!(report.summary.committed, 2);
    assert!(report.check_invariants().is_ok());

    let stored = api.export_standard("STD-2024-01").unwrap();
    let codes: Vec<&str> = stored.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["01", "03"]);
    assert_eq!(stored[1].weight, Some(35.5));
    assert_eq!(stored[0].imported_by.as_deref(), Some("tester"));

    let batches = api.list_batches("STD-2024-01", 10).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch_id, report.batch_id);
    assert_eq!(batches[0].committed_rows, 2);
    assert_eq!(batches[0].duplicate_rows, 1);
}

#[tokio::test]
async fn test_reimport_surfaces_existing_codes_as_commit_failures() {
    logging::init_test();
    let (dir, db_path) = create_test_db();
    let first = write_csv(&dir, "a.csv", &["Code,Name", "01,Alpha", "02,Beta"]);
    let second = write_csv(&dir, "b.csv", &["Code,Name", "02,Beta again", "04,Delta"]);
    let api = api(&db_path);
    let cancel = CancellationToken::new();

    api.import_file(first.to_str().unwrap(), &context(), &cancel)
        .await
        .unwrap();
    let response = api
        .import_file(second.to_str().unwrap(), &context(), &cancel)
        .await
        .unwrap();

    // 批内无重复，跨批次冲突由存储层拒绝
    let report = &response.report;
    assert!(report.duplicate_records.is_empty());
    assert!(matches!(
        report.commit_outcomes[0].status,
        CommitStatus::Failed { .. }
    ));
    assert!(report.commit_outcomes[0].error().is_some());
    assert!(report.commit_outcomes[1].success());
    assert_eq!(api.export_standard("STD-2024-01").unwrap().len(), 3);
}

#[tokio::test]
async fn test_same_code_under_other_standard_is_allowed() {
    let (dir, db_path) = create_test_db();
    let file = write_csv(&dir, "a.csv", &["Code,Name", "01,Alpha"]);
    let api = api(&db_path);
    let cancel = CancellationToken::new();

    api.import_file(file.to_str().unwrap(), &context(), &cancel)
        .await
        .unwrap();
    let response = api
        .import_file(file.to_str().unwrap(), &ImportContext::new("STD-OTHER"), &cancel)
        .await
        .unwrap();

    assert_eq!(response.report.summary.committed, 1);
}

#[tokio::test]
async fn test_exported_csv_can_be_reimported() {
    logging::init_test();
    let (dir, db_path) = create_test_db();
    let file = write_csv(
        &dir,
        "source.csv",
        &["Nombre,Código,Peso,Estado", "Misión,1,40,ACTIVE", "Visión,2,60,INACTIVE"],
    );
    let api = api(&db_path);
    let cancel = CancellationToken::new();

    api.import_file(file.to_str().unwrap(), &context(), &cancel)
        .await
        .unwrap();

    let exported = api.export_standard_csv("STD-2024-01").await.unwrap();
    let exported_path = dir.path().join("exported.csv");
    std::fs::write(&exported_path, &exported).unwrap();

    let response = api
        .import_file(
            exported_path.to_str().unwrap(),
            &ImportContext::new("STD-COPY"),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(response.report.invalid_records.len(), 0);
    assert_eq!(response.report.summary.committed, 2);
    let copied = api.export_standard("STD-COPY").unwrap();
    assert_eq!(copied[0].name, "Misión");
    assert_eq!(copied[1].weight, Some(60.0));
}

#[tokio::test]
async fn test_preview_does_not_write() {
    let (dir, db_path) = create_test_db();
    let file = write_csv(&dir, "a.csv", &["编号,名称", "01,A", "01,B", "x,C"]);
    let api = api(&db_path);

    let preview = api.preview_file(file.to_str().unwrap()).await.unwrap();

    assert_eq!(preview.total_rows, 3);
    assert_eq!(preview.valid_count, 1);
    assert_eq!(preview.duplicate_records.len(), 1);
    assert_eq!(preview.invalid_records.len(), 1);
    assert!(api.export_standard("STD-2024-01").unwrap().is_empty());
    assert!(api.list_batches("STD-2024-01", 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_header_only_file_reports_nothing() {
    let (dir, db_path) = create_test_db();
    let file = write_csv(&dir, "empty.csv", &["编号,名称,权重(%)"]);

    let response = api(&db_path)
        .import_file(file.to_str().unwrap(), &context(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.report.total_rows, 0);
    assert!(response.report.commit_outcomes.is_empty());
}

#[tokio::test]
async fn test_empty_file_is_structural_error() {
    let (dir, db_path) = create_test_db();
    let file = write_csv(&dir, "empty.csv", &[]);

    let err = api(&db_path)
        .import_file(file.to_str().unwrap(), &context(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::StructuralInput(_)));
    assert!(err.is_structural());
}

#[tokio::test]
async fn test_missing_file_and_unsupported_format() {
    let (dir, db_path) = create_test_db();
    let api = api(&db_path);
    let cancel = CancellationToken::new();

    let missing = api
        .import_file("/nonexistent/criteria.csv", &context(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(missing, ApiError::NotFound(_)));

    let txt = dir.path().join("criteria.txt");
    std::fs::write(&txt, "Code,Name\n01,A").unwrap();
    let unsupported = api
        .import_file(txt.to_str().unwrap(), &context(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(unsupported, ApiError::ImportError(_)));
}

#[tokio::test]
async fn test_cancelled_before_start_commits_nothing() {
    let (dir, db_path) = create_test_db();
    let file = write_csv(&dir, "a.csv", &["Code,Name", "01,A", "02,B"]);
    let api = api(&db_path);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let response = api
        .import_file(file.to_str().unwrap(), &context(), &cancel)
        .await
        .unwrap();

    assert!(response.report.cancelled);
    assert_eq!(response.report.summary.not_processed, 2);
    assert!(api.export_standard("STD-2024-01").unwrap().is_empty());
    assert!(api.list_batches("STD-2024-01", 10).unwrap()[0].cancelled);
}

#[tokio::test]
async fn test_saved_profile_changes_mapping() {
    logging::init_test();
    let (dir, db_path) = create_test_db();

    let mut profile = ImportProfile::default();
    profile
        .synonyms
        .get_mut(&evidence_import::CanonicalField::Code)
        .unwrap()
        .push("Ref".to_string());
    let profile_path = dir.path().join("profile.json");
    std::fs::write(&profile_path, profile.to_json_string().unwrap()).unwrap();

    let base = api(&db_path);
    base.save_profile_from_file("with-ref", profile_path.to_str().unwrap())
        .unwrap();
    assert_eq!(base.list_profiles().unwrap(), vec!["with-ref".to_string()]);

    let file = write_csv(&dir, "a.csv", &["Ref,Name", "07,Seven"]);
    let cancel = CancellationToken::new();

    let with_default = base
        .import_file(file.to_str().unwrap(), &context(), &cancel)
        .await
        .unwrap();
    assert_eq!(with_default.report.valid_count, 0);

    let with_profile = api(&db_path)
        .with_profile_id("with-ref")
        .import_file(file.to_str().unwrap(), &ImportContext::new("STD-REF"), &cancel)
        .await
        .unwrap();
    assert_eq!(with_profile.report.summary.committed, 1);
}

#[tokio::test]
async fn test_template_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("t.db");
    let api = api(db_path.to_str().unwrap());

    let template = api.generate_template_csv().await.unwrap();
    let path = dir.path().join("template.csv");
    std::fs::write(&path, template).unwrap();

    let preview = api.preview_file(path.to_str().unwrap()).await.unwrap();
    assert_eq!(preview.total_rows, 2);
    assert_eq!(preview.valid_count, 2);
}

#[tokio::test]
async fn test_empty_lines_keep_source_row_numbers() {
    let (dir, db_path) = create_test_db();
    let file = write_csv(
        &dir,
        "gaps.csv",
        &["Code,Name", "01,A", "", "x3,C", "", "01,E"],
    );

    let response = api(&db_path)
        .import_file(file.to_str().unwrap(), &context(), &CancellationToken::new())
        .await
        .unwrap();

    let report = &response.report;
    assert_eq!(report.total_rows, 3);
    assert_eq!(report.invalid_records[0].record.row_index, 3);
    assert_eq!(report.duplicate_records[0].record.row_index, 5);
    assert_eq!(report.duplicate_records[0].conflict.first_row_index, 1);
}

#[tokio::test]
async fn test_import_xlsx_fixture() {
    logging::init_test();
    let (_dir, db_path) = create_test_db();
    let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/criteria.xlsx");
    let api = api(&db_path);

    let response = api
        .import_file(fixture.to_str().unwrap(), &context(), &CancellationToken::new())
        .await
        .unwrap();

    let report = &response.report;
    assert_eq!(report.total_rows, 3);
    assert_eq!(report.summary.committed, 2);
    assert_eq!(report.invalid_records[0].record.row_index, 4);

    let stored = api.export_standard("STD-2024-01").unwrap();
    let codes: Vec<&str> = stored.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["06", "5"]);
    assert_eq!(stored[1].weight, Some(20.0));
}
