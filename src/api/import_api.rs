// ==========================================
// 认证证据导入 - 导入API
// ==========================================
// 职责: 封装文件导入 / 模板下载 / 导出回读 / 配置档管理
// 说明: 导入结果以完整报告返回；只有结构性错误以 ApiError 返回
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader, ImportProfile, StaticConfig};
use crate::db::open_sqlite_connection;
use crate::domain::criterion::EvidenceCriterion;
use crate::domain::evidence::{CanonicalField, ImportContext, RawRow, RawTable};
use crate::domain::import_report::{ImportPreview, ImportReport};
use crate::importer::{
    generate_template, write_csv, FileParser, ImportPipeline, UniversalFileParser,
};
use crate::repository::{ImportBatchEntity, SqliteEvidenceRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 所属标准
    pub standard_id: String,
    /// 源文件名
    pub source_name: Option<String>,
    /// 导入报告
    pub report: ImportReport,
}

/// 导入API
pub struct ImportApi {
    config_manager: Arc<ConfigManager>,
    // 导入时读取配置档的来源: 默认为 config_kv，with_profile 后为内存配置
    profile_reader: Arc<dyn ImportConfigReader>,
    repo: Arc<SqliteEvidenceRepository>,
    profile_id: Option<String>,
}

impl ImportApi {
    /// 打开数据库（配置与指标共用一个连接）
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = ConfigManager::from_connection(conn.clone())?;
        let repo = SqliteEvidenceRepository::from_connection(conn)?;

        Ok(Self::from_parts(Arc::new(config_manager), Arc::new(repo)))
    }

    pub fn from_parts(
        config_manager: Arc<ConfigManager>,
        repo: Arc<SqliteEvidenceRepository>,
    ) -> Self {
        Self {
            profile_reader: config_manager.clone(),
            config_manager,
            repo,
            profile_id: None,
        }
    }

    /// 使用已存储的配置档
    pub fn with_profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    /// 直接使用给定配置档（优先于 profile_id）
    pub fn with_profile(mut self, profile: ImportProfile) -> Self {
        self.profile_reader = Arc::new(StaticConfig::new(profile));
        self
    }

    async fn current_profile(&self) -> ApiResult<ImportProfile> {
        let profile = self
            .profile_reader
            .resolve_import_profile(self.profile_id.as_deref())
            .await?;
        Ok(profile)
    }

    /// 导入文件（.csv / .xlsx / .xls）
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 完整报告（含逐行失败）
    /// - Err(ApiError::StructuralInput): 空文件 / 缺表头
    /// - Err: 文件读取或配置错误
    pub async fn import_file(
        &self,
        file_path: &str,
        context: &ImportContext,
        cancel: &CancellationToken,
    ) -> ApiResult<ImportApiResponse> {
        let path = Path::new(file_path);
        let table = UniversalFileParser.parse_to_table(path)?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());

        self.import_table(table, context, source_name, cancel).await
    }

    /// 导入内存表格
    pub async fn import_table(
        &self,
        table: RawTable,
        context: &ImportContext,
        source_name: Option<String>,
        cancel: &CancellationToken,
    ) -> ApiResult<ImportApiResponse> {
        if context.standard_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("standard_id 不能为空".to_string()));
        }

        let profile = self.current_profile().await?;
        let pipeline = ImportPipeline::from_profile(&profile)?;

        let report = pipeline
            .run(table, context, self.repo.as_ref(), cancel)
            .await?;

        // 批次记录失败不影响已提交的数据
        if let Err(e) = self
            .repo
            .insert_batch(context, source_name.as_deref(), &report)
        {
            warn!(batch_id = %report.batch_id, error = %e, "导入批次记录写入失败");
        }

        info!(
            batch_id = %report.batch_id,
            standard_id = %context.standard_id,
            committed = report.summary.committed,
            "文件导入完成"
        );

        Ok(ImportApiResponse {
            standard_id: context.standard_id.clone(),
            source_name,
            report,
        })
    }

    /// 试运行导入文件：返回分类结果，不写入数据库
    pub async fn preview_file(&self, file_path: &str) -> ApiResult<ImportPreview> {
        let table = UniversalFileParser.parse_to_table(Path::new(file_path))?;
        let profile = self.current_profile().await?;
        let pipeline = ImportPipeline::from_profile(&profile)?;
        Ok(pipeline.preview(&table)?)
    }

    /// 生成导入模板（CSV）
    pub async fn generate_template_csv(&self) -> ApiResult<Vec<u8>> {
        let profile = self.current_profile().await?;
        Ok(write_csv(&generate_template(&profile))?)
    }

    /// 导出某标准下已入库的指标
    pub fn export_standard(&self, standard_id: &str) -> ApiResult<Vec<EvidenceCriterion>> {
        Ok(self.repo.list_by_standard(standard_id)?)
    }

    /// 导出为模板格式 CSV（可直接再次导入）
    pub async fn export_standard_csv(&self, standard_id: &str) -> ApiResult<Vec<u8>> {
        let profile = self.current_profile().await?;
        let criteria = self.export_standard(standard_id)?;

        let columns: Vec<(CanonicalField, String)> = CanonicalField::ALL
            .iter()
            .filter_map(|f| profile.display_header(*f).map(|h| (*f, h.to_string())))
            .collect();

        let headers = columns.iter().map(|(_, h)| h.clone()).collect();
        let rows = criteria
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                let record = c.to_record(idx + 1);
                let cells = columns
                    .iter()
                    .map(|(f, _)| record.value(*f).unwrap_or_default().to_string())
                    .collect();
                RawRow::new(idx + 1, cells)
            })
            .collect();

        Ok(write_csv(&RawTable::new(headers, rows))?)
    }

    /// 查询最近的导入批次
    pub fn list_batches(&self, standard_id: &str, limit: usize) -> ApiResult<Vec<ImportBatchEntity>> {
        Ok(self.repo.list_batches(standard_id, limit)?)
    }

    /// 保存配置档（JSON 文件）
    pub fn save_profile_from_file(&self, profile_id: &str, file_path: &str) -> ApiResult<()> {
        let profile = ImportProfile::load_from_file(file_path)?;
        self.config_manager.save_import_profile(profile_id, &profile)?;
        info!(profile_id, "导入配置档已保存");
        Ok(())
    }

    pub fn list_profiles(&self) -> ApiResult<Vec<String>> {
        Ok(self.config_manager.list_import_profile_ids()?)
    }
}
