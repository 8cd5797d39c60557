// ==========================================
// 认证证据导入 - 文件解析器实现
// ==========================================
// 职责: 源文件 → RawTable（表头 + 数据行，列顺序保留）
// 支持: Excel (.xlsx/.xls，第一个工作表) / CSV (.csv)
// 说明: 单元格保留原文，不在此处 trim；空白行保留行号位置，由映射阶段丢弃
// ==========================================

use crate::domain::evidence::{RawRow, RawTable};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::evidence_importer_trait::FileParser;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 二维单元格 → RawTable；一行都没有时为结构性错误
fn grid_to_table(grid: Vec<Vec<String>>, path: &Path) -> ImportResult<RawTable> {
    let table = RawTable::from_grid(grid).ok_or(ImportError::EmptyInput)?;
    log_parsed(&table, path);
    Ok(table)
}

fn log_parsed(table: &RawTable, path: &Path) {
    debug!(
        file = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "文件解析完成"
    );
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 从任意 reader 读取（文件与内存数据共用）
    ///
    /// 行号取自源文件行位置（相对表头行）。csv 会跳过完全空的行，
    /// 按记录计数会让其后的行号整体前移。
    pub fn parse_reader<R: std::io::Read>(&self, reader: R) -> ImportResult<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头由 RawTable 处理
            .flexible(true) // 允许行长度不一致
            .from_reader(reader);

        let mut header_line: Option<u64> = None;
        let mut headers: Vec<String> = Vec::new();
        let mut rows: Vec<RawRow> = Vec::new();

        for result in reader.records() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            let line = record.position().map(|p| p.line());

            match (header_line, line) {
                (None, _) => {
                    header_line = Some(line.unwrap_or(1));
                    headers = cells;
                }
                (Some(start), Some(line)) => {
                    rows.push(RawRow::new(line.saturating_sub(start) as usize, cells));
                }
                (Some(_), None) => {
                    let next = rows.last().map_or(1, |r| r.row_index + 1);
                    rows.push(RawRow::new(next, cells));
                }
            }
        }

        if header_line.is_none() {
            return Err(ImportError::EmptyInput);
        }

        // 去掉 UTF-8 BOM（Excel 另存为 CSV 时常见）
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        Ok(RawTable::new(headers, rows))
    }
}

impl FileParser for CsvParser {
    fn parse_to_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let table = self.parse_reader(file)?;
        log_parsed(&table, file_path);
        Ok(table)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let grid: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        grid_to_table(grid, file_path)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_to_table(file_path),
            "xlsx" | "xls" => ExcelParser.parse_to_table(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
