//! evidence-import 命令行参数定义

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "evidence-import",
    version,
    about = "认证证据批量导入: 表头映射 / 校验 / 去重 / 提交 / 报告"
)]
pub struct Cli {
    /// SQLite 数据库路径（默认: 用户数据目录）
    #[arg(long, global = true, env = "EVIDENCE_IMPORT_DB_PATH")]
    pub db: Option<String>,

    /// 使用已保存的导入配置档
    #[arg(long, global = true, conflicts_with = "profile_file")]
    pub profile: Option<String>,

    /// 使用 JSON 文件中的导入配置档
    #[arg(long, global = true)]
    pub profile_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 导入文件（.csv / .xlsx / .xls），输出导入报告
    Import {
        /// 源文件路径
        file: PathBuf,

        /// 所属标准 ID
        #[arg(long)]
        standard: String,

        /// 所属组织 ID
        #[arg(long)]
        organization: Option<String>,

        /// 导入人
        #[arg(long, env = "USER")]
        imported_by: Option<String>,

        /// 只校验与分类，不写入数据库
        #[arg(long)]
        dry_run: bool,
    },
    /// 生成导入模板（CSV）
    Template {
        /// 输出文件（默认输出到 stdout）
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// 导出某标准下已入库的指标
    Export {
        /// 所属标准 ID
        #[arg(long)]
        standard: String,

        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// 输出文件（默认输出到 stdout）
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// 查询某标准最近的导入批次
    Batches {
        #[arg(long)]
        standard: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// 导入配置档管理
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// 保存 JSON 配置档
    Save { id: String, file: PathBuf },
    /// 列出已保存的配置档
    List,
    /// 输出内置默认配置档（可作为自定义起点）
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}
