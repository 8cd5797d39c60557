// ==========================================
// 认证证据导入 - 评估指标仓储
// ==========================================
// 职责: evidence_criterion / import_batch 表的写入与查询
// 红线: Repository 不含业务逻辑（校验与去重在导入层完成）
// 说明: UNIQUE(standard_id, code) 兜底跨批次重复，冲突时单条提交失败
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::criterion::EvidenceCriterion;
use crate::domain::evidence::{CanonicalField, EvidenceRecord, ImportContext};
use crate::domain::import_report::ImportReport;
use crate::importer::evidence_importer_trait::{CreateResult, RecordCreator};
use crate::importer::record_validator::parse_number;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS evidence_criterion (
    criterion_id TEXT PRIMARY KEY,
    standard_id TEXT NOT NULL,
    organization_id TEXT,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    weight REAL,
    status TEXT,
    responsible TEXT,
    evidence_type TEXT,
    imported_by TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (standard_id, code)
);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id TEXT PRIMARY KEY,
    standard_id TEXT NOT NULL,
    source_name TEXT,
    total_rows INTEGER NOT NULL,
    valid_rows INTEGER NOT NULL,
    invalid_rows INTEGER NOT NULL,
    duplicate_rows INTEGER NOT NULL,
    committed_rows INTEGER NOT NULL,
    failed_rows INTEGER NOT NULL,
    not_processed_rows INTEGER NOT NULL,
    cancelled INTEGER NOT NULL DEFAULT 0,
    imported_by TEXT,
    imported_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    report_json TEXT NOT NULL
);
"#;

const CRITERION_COLUMNS: &str = r#"
    criterion_id, standard_id, organization_id,
    code, name, description, weight, status, responsible, evidence_type,
    imported_by, created_at
"#;

// ==========================================
// ImportBatchEntity - 导入批次记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatchEntity {
    pub batch_id: String,
    pub standard_id: String,
    pub source_name: Option<String>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub duplicate_rows: usize,
    pub committed_rows: usize,
    pub failed_rows: usize,
    pub not_processed_rows: usize,
    pub cancelled: bool,
    pub imported_by: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

// ==========================================
// SqliteEvidenceRepository
// ==========================================
pub struct SqliteEvidenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEvidenceRepository {
    /// 打开数据库文件并建表
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建仓储实例（与 ConfigManager 共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.init_schema()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn init_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// 插入单条指标
    ///
    /// # 返回
    /// - Ok(criterion_id)
    /// - Err(UniqueConstraintViolation): 同一标准下编号已存在
    pub fn insert_criterion(
        &self,
        context: &ImportContext,
        record: &EvidenceRecord,
    ) -> RepositoryResult<String> {
        let code = required(record, CanonicalField::Code)?;
        let name = required(record, CanonicalField::Name)?;
        let weight = match record.value(CanonicalField::Weight) {
            Some(raw) => Some(parse_number(raw).ok_or_else(|| RepositoryError::FieldValueError {
                field: CanonicalField::Weight.to_string(),
                message: format!("不是有效数字: {}", raw),
            })?),
            None => None,
        };

        let criterion_id = Uuid::new_v4().to_string();
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO evidence_criterion (
                criterion_id, standard_id, organization_id,
                code, name, description, weight, status, responsible, evidence_type,
                imported_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                criterion_id,
                context.standard_id,
                context.organization_id,
                code,
                name,
                record.value(CanonicalField::Description),
                weight,
                record.value(CanonicalField::Status),
                record.value(CanonicalField::Responsible),
                record.value(CanonicalField::EvidenceType),
                context.imported_by,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(criterion_id)
    }

    /// 导出某标准下的全部指标（按编号排序）
    pub fn list_by_standard(&self, standard_id: &str) -> RepositoryResult<Vec<EvidenceCriterion>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM evidence_criterion WHERE standard_id = ?1 ORDER BY code, created_at",
            CRITERION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let criteria = stmt
            .query_map(params![standard_id], map_criterion)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(criteria)
    }

    pub fn count_by_standard(&self, standard_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM evidence_criterion WHERE standard_id = ?1",
            params![standard_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 记录导入批次（报告全文以 JSON 保存）
    pub fn insert_batch(
        &self,
        context: &ImportContext,
        source_name: Option<&str>,
        report: &ImportReport,
    ) -> RepositoryResult<()> {
        let report_json = serde_json::to_string(report)
            .map_err(|e| RepositoryError::Other(anyhow::Error::new(e)))?;
        let s = &report.summary;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, standard_id, source_name,
                total_rows, valid_rows, invalid_rows, duplicate_rows,
                committed_rows, failed_rows, not_processed_rows, cancelled,
                imported_by, imported_at, elapsed_ms, report_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                report.batch_id,
                context.standard_id,
                source_name,
                s.total_rows as i64,
                s.valid as i64,
                s.invalid as i64,
                s.duplicate as i64,
                s.committed as i64,
                s.failed as i64,
                s.not_processed as i64,
                report.cancelled,
                context.imported_by,
                Utc::now().to_rfc3339(),
                report.elapsed_ms as i64,
                report_json,
            ],
        )?;

        Ok(())
    }

    /// 查询某标准最近的导入批次
    pub fn list_batches(
        &self,
        standard_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<ImportBatchEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                batch_id, standard_id, source_name,
                total_rows, valid_rows, invalid_rows, duplicate_rows,
                committed_rows, failed_rows, not_processed_rows, cancelled,
                imported_by, imported_at, elapsed_ms
            FROM import_batch
            WHERE standard_id = ?1
            ORDER BY imported_at DESC
            LIMIT ?2
            "#,
        )?;

        let batches = stmt
            .query_map(params![standard_id, limit as i64], |row| {
                Ok(ImportBatchEntity {
                    batch_id: row.get(0)?,
                    standard_id: row.get(1)?,
                    source_name: row.get(2)?,
                    total_rows: row.get::<_, i64>(3)? as usize,
                    valid_rows: row.get::<_, i64>(4)? as usize,
                    invalid_rows: row.get::<_, i64>(5)? as usize,
                    duplicate_rows: row.get::<_, i64>(6)? as usize,
                    committed_rows: row.get::<_, i64>(7)? as usize,
                    failed_rows: row.get::<_, i64>(8)? as usize,
                    not_processed_rows: row.get::<_, i64>(9)? as usize,
                    cancelled: row.get(10)?,
                    imported_by: row.get(11)?,
                    imported_at: parse_timestamp(12, row.get::<_, String>(12)?)?,
                    elapsed_ms: row.get::<_, i64>(13)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }
}

fn required<'a>(record: &'a EvidenceRecord, field: CanonicalField) -> RepositoryResult<&'a str> {
    record
        .value(field)
        .ok_or_else(|| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: "必填字段为空".to_string(),
        })
}

/// 时间列损坏时报错，不用当前时间顶替
fn parse_timestamp(column: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_criterion(row: &Row<'_>) -> rusqlite::Result<EvidenceCriterion> {
    Ok(EvidenceCriterion {
        criterion_id: row.get(0)?,
        standard_id: row.get(1)?,
        organization_id: row.get(2)?,
        code: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        weight: row.get(6)?,
        status: row.get(7)?,
        responsible: row.get(8)?,
        evidence_type: row.get(9)?,
        imported_by: row.get(10)?,
        created_at: parse_timestamp(11, row.get::<_, String>(11)?)?,
    })
}

// ==========================================
// RecordCreator 实现 - 导入提交阶段的创建操作
// ==========================================
#[async_trait]
impl RecordCreator for SqliteEvidenceRepository {
    async fn create(&self, context: &ImportContext, record: &EvidenceRecord) -> CreateResult {
        match self.insert_criterion(context, record) {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => Err(format!(
                "编号 {} 在标准 {} 下已存在",
                record.value(CanonicalField::Code).unwrap_or_default(),
                context.standard_id
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}
