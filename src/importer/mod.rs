// ==========================================
// 认证证据导入 - 导入层
// ==========================================
// 职责: 外部表格数据 → 分类 → 逐条提交 → 导入报告
// 支持: Excel, CSV, 内存表格
// ==========================================

// 模块声明
pub mod batch_committer;
pub mod duplicate_detector;
pub mod error;
pub mod evidence_importer_trait;
pub mod file_parser;
pub mod header_mapper;
pub mod import_pipeline;
pub mod record_validator;
pub mod report_aggregator;
pub mod template;

// 重导出核心类型
pub use batch_committer::BatchCommitter;
pub use duplicate_detector::DuplicateDetector as DuplicateDetectorImpl;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use header_mapper::HeaderMapper as HeaderMapperImpl;
pub use import_pipeline::ImportPipeline;
pub use record_validator::{parse_number, RecordValidator as RecordValidatorImpl, ValidationRule};
pub use report_aggregator::ReportAggregator;
pub use template::{generate_template, write_csv};

// 重导出 Trait 接口
pub use evidence_importer_trait::{
    CreateResult, DuplicateDetector, FileParser, FnCreator, HeaderMapper, RecordCreator,
    RecordValidator,
};
