// ==========================================
// 认证证据导入 - 命令行入口
// ==========================================
// 输出: 结果以 JSON 写 stdout，日志写 stderr
// 退出码: 0 成功 / 1 失败 / 2 输入结构错误 / 130 导入被中断
// ==========================================

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, ExportFormat, ProfileCommand};
use evidence_import::api::ApiError;
use evidence_import::app::{get_default_db_path, AppState};
use evidence_import::config::ImportProfile;
use evidence_import::domain::ImportContext;
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    evidence_import::logging::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "命令执行失败");
            eprintln!("错误: {:#}", err);
            match err.downcast_ref::<ApiError>() {
                Some(api_err) if api_err.is_structural() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let db_path = cli.db.clone().unwrap_or_else(get_default_db_path);
    let profile = cli
        .profile_file
        .as_ref()
        .map(ImportProfile::load_from_file)
        .transpose()
        .context("读取配置档文件失败")?;

    tracing::info!(version = evidence_import::VERSION, db_path = %db_path, "evidence-import 启动");
    let state = AppState::new(db_path, cli.profile.clone(), profile)?;
    let api = state.import_api.clone();

    match cli.command {
        Command::Import {
            file,
            standard,
            organization,
            imported_by,
            dry_run,
        } => {
            let file = path_str(&file)?;
            if dry_run {
                print_json(&api.preview_file(file).await?)?;
                return Ok(ExitCode::SUCCESS);
            }

            let context = ImportContext {
                standard_id: standard,
                organization_id: organization,
                imported_by,
            };

            // Ctrl-C: 停止提交剩余记录，已提交的保持不变
            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("收到中断信号，停止提交剩余记录");
                    signal_token.cancel();
                }
            });

            let response = api.import_file(file, &context, &cancel).await?;
            print_json(&response)?;

            if response.report.cancelled {
                return Ok(ExitCode::from(130));
            }
        }
        Command::Template { out } => {
            let bytes = api.generate_template_csv().await?;
            write_output(out.as_deref(), &bytes)?;
        }
        Command::Export {
            standard,
            format,
            out,
        } => {
            let bytes = match format {
                ExportFormat::Json => {
                    serde_json::to_vec_pretty(&api.export_standard(&standard)?)?
                }
                ExportFormat::Csv => api.export_standard_csv(&standard).await?,
            };
            write_output(out.as_deref(), &bytes)?;
        }
        Command::Batches { standard, limit } => {
            print_json(&api.list_batches(&standard, limit)?)?;
        }
        Command::Profile(ProfileCommand::Save { id, file }) => {
            api.save_profile_from_file(&id, path_str(&file)?)?;
            print_json(&serde_json::json!({ "saved": id }))?;
        }
        Command::Profile(ProfileCommand::List) => {
            print_json(&api.list_profiles()?)?;
        }
        Command::Profile(ProfileCommand::Default) => {
            print_json(&ImportProfile::default())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn path_str(path: &Path) -> anyhow::Result<&str> {
    path.to_str()
        .with_context(|| format!("路径不是有效 UTF-8: {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_output(out: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    match out {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("写入文件失败: {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "已写入文件");
        }
        None => std::io::stdout().write_all(bytes)?,
    }
    Ok(())
}
