// ==========================================
// 认证证据导入 - 性能统计
// ==========================================
// 职责: SQL 语句计数 + 慢 SQL 告警 + 阶段耗时
// 说明: 计数为进程级（导入跨 await 点，可能在不同线程上恢复）
// ==========================================

use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const PERF_SQL_ENV: &str = "EVIDENCE_IMPORT_PERF_SQL";
pub const SLOW_SQL_MS_ENV: &str = "EVIDENCE_IMPORT_SLOW_SQL_MS";

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);
static SQL_COUNT: AtomicU64 = AtomicU64::new(0);

fn env_flag(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 日志中的 SQL 压成单行并截断（按字符，不切断多字节字符）
fn one_line_sql(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

/// 为连接挂上 trace/profile 回调
///
/// - `EVIDENCE_IMPORT_PERF_SQL`: 开关（debug 构建默认开）
/// - `EVIDENCE_IMPORT_SLOW_SQL_MS`: 慢 SQL 阈值，默认 debug 50ms / release 200ms
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = std::env::var(PERF_SQL_ENV)
        .map(|v| env_flag(&v))
        .unwrap_or(cfg!(debug_assertions));
    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let default_ms = if cfg!(debug_assertions) { 50 } else { 200 };
    let slow_ms = std::env::var(SLOW_SQL_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_ms);
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_statement));
    conn.profile(Some(on_statement_done));
}

fn on_statement(_sql: &str) {
    SQL_COUNT.fetch_add(1, Ordering::Relaxed);
}

fn on_statement_done(sql: &str, duration: Duration) {
    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %one_line_sql(sql, 400),
            "慢 SQL"
        );
    }
}

/// 已执行的 SQL 语句总数（未开启统计时恒为 0）
pub fn sql_statements_executed() -> u64 {
    SQL_COUNT.load(Ordering::Relaxed)
}

// ==========================================
// PerfGuard - 阶段耗时
// ==========================================
// Drop 时输出 debug 日志: 耗时 + 期间执行的 SQL 数
// 并发导入时 SQL 数包含其他批次的语句，只作参考
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            sql_start: sql_statements_executed(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let sql_count = if PERF_SQL_ENABLED.load(Ordering::Relaxed) {
            Some(sql_statements_executed().saturating_sub(self.sql_start))
        } else {
            None
        };

        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.elapsed_ms(),
            sql_count = ?sql_count,
            "阶段结束"
        );
    }
}
