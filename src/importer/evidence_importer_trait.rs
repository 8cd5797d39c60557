// ==========================================
// 认证证据导入 - 导入组件 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 解析 → 表头映射 → 校验 + 批内去重 → 提交 → 报告
// ==========================================

use crate::domain::evidence::{
    CanonicalField, EvidenceRecord, FieldMapping, ImportContext, RawRow, RawTable,
};
use crate::domain::import_report::{DuplicateConflict, ValidationError};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（表格解码属于外部协作方，管道只消费 RawTable）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表格（表头 + 数据行，保留列顺序）
    fn parse_to_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

// ==========================================
// HeaderMapper Trait
// ==========================================
// 用途: 表头映射接口（阶段 1）
// 实现者: HeaderMapperImpl
pub trait HeaderMapper: Send + Sync {
    /// 表头 → 字段映射（纯函数，未知表头映射为未映射，不报错）
    fn map(&self, headers: &[String]) -> Vec<FieldMapping>;

    /// 按映射把数据行转成记录；整行空白的行直接丢弃
    fn apply(&self, mapping: &[FieldMapping], rows: &[RawRow]) -> Vec<EvidenceRecord>;
}

// ==========================================
// RecordValidator Trait
// ==========================================
// 用途: 逐条记录业务规则校验（阶段 2）
// 实现者: RecordValidatorImpl
pub trait RecordValidator: Send + Sync {
    /// 返回全部违规（空 = 合法），不短路
    fn validate(&self, record: &EvidenceRecord) -> Vec<ValidationError>;
}

// ==========================================
// DuplicateDetector Trait
// ==========================================
// 用途: 批内唯一键冲突检测（阶段 2）
// 实现者: DuplicateDetectorImpl
pub trait DuplicateDetector: Send + Sync {
    /// 返回 行号 → 首次出现信息（首次出现的行不在结果中）
    fn detect(
        &self,
        records: &[EvidenceRecord],
        key_field: CanonicalField,
    ) -> BTreeMap<usize, DuplicateConflict>;
}

/// 创建操作结果
pub type CreateResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

// ==========================================
// RecordCreator Trait
// ==========================================
// 用途: 外部提供的单条创建操作（阶段 3）
// 说明: 每次调用独立成败；管道不重试、不设超时
// 实现者: SqliteEvidenceRepository, FnCreator, 测试替身
#[async_trait]
pub trait RecordCreator: Send + Sync {
    async fn create(&self, context: &ImportContext, record: &EvidenceRecord) -> CreateResult;
}

// ==========================================
// FnCreator - 闭包形式的创建操作
// ==========================================
pub struct FnCreator<F>(pub F);

#[async_trait]
impl<F, Fut> RecordCreator for FnCreator<F>
where
    F: Fn(ImportContext, EvidenceRecord) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CreateResult> + Send + 'static,
{
    async fn create(&self, context: &ImportContext, record: &EvidenceRecord) -> CreateResult {
        (self.0)(context.clone(), record.clone()).await
    }
}
