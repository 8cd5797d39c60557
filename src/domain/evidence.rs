// ==========================================
// 认证证据导入 - 证据记录领域模型
// ==========================================
// 职责: 原始行 / 原始表 / 标准字段 / 映射后记录 / 导入上下文
// 红线: 记录构造完成后不再修改
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CanonicalField - 标准字段
// ==========================================
// 用途: 业务规则与下游存储使用的稳定字段名，与源文件列名无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Code,         // 指标编号（批次内唯一键）
    Name,         // 指标名称
    Description,  // 指标说明
    Weight,       // 权重（百分比）
    Status,       // 生命周期状态
    Responsible,  // 责任人
    EvidenceType, // 证据类型
}

impl CanonicalField {
    /// 全部标准字段（模板列顺序）
    pub const ALL: [CanonicalField; 7] = [
        CanonicalField::Code,
        CanonicalField::Name,
        CanonicalField::Description,
        CanonicalField::Weight,
        CanonicalField::Status,
        CanonicalField::Responsible,
        CanonicalField::EvidenceType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Code => "code",
            CanonicalField::Name => "name",
            CanonicalField::Description => "description",
            CanonicalField::Weight => "weight",
            CanonicalField::Status => "status",
            CanonicalField::Responsible => "responsible",
            CanonicalField::EvidenceType => "evidence_type",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// FieldMapping - 列 → 标准字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub column: usize,                  // 列序号（0 起）
    pub header: String,                 // 源表头原文
    pub target: Option<CanonicalField>, // None: 未映射，整列忽略
}

impl FieldMapping {
    pub fn is_mapped(&self) -> bool {
        self.target.is_some()
    }
}

// ==========================================
// RawRow - 原始数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_index: usize,   // 源文件中的位置（1 起，不含表头）
    pub cells: Vec<String>, // 单元格文本（按列顺序）
}

impl RawRow {
    pub fn new(row_index: usize, cells: Vec<String>) -> Self {
        Self { row_index, cells }
    }

    /// 是否整行空白
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

// ==========================================
// RawTable - 原始表格（表头 + 数据行）
// ==========================================
// 用途: 文件解析器的输出、导入管道的输入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    /// 由二维单元格构建：第一行为表头，其余为数据行（行号从 1 开始）
    ///
    /// 返回 None 表示连表头都没有
    pub fn from_grid(grid: Vec<Vec<String>>) -> Option<Self> {
        let mut iter = grid.into_iter();
        let headers = iter.next()?;
        let rows = iter
            .enumerate()
            .map(|(idx, cells)| RawRow::new(idx + 1, cells))
            .collect();
        Some(Self { headers, rows })
    }
}

// ==========================================
// EvidenceRecord - 映射后的证据记录
// ==========================================
// 说明: 值保留源文件原文，空单元格为 None；规则读取时再 trim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub row_index: usize,

    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub weight: Option<String>,
    pub status: Option<String>,
    pub responsible: Option<String>,
    pub evidence_type: Option<String>,
}

impl EvidenceRecord {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            ..Default::default()
        }
    }

    /// 构建辅助（测试与模板使用）
    pub fn with(mut self, field: CanonicalField, value: impl Into<String>) -> Self {
        self.set(field, value.into());
        self
    }

    fn slot_mut(&mut self, field: CanonicalField) -> &mut Option<String> {
        match field {
            CanonicalField::Code => &mut self.code,
            CanonicalField::Name => &mut self.name,
            CanonicalField::Description => &mut self.description,
            CanonicalField::Weight => &mut self.weight,
            CanonicalField::Status => &mut self.status,
            CanonicalField::Responsible => &mut self.responsible,
            CanonicalField::EvidenceType => &mut self.evidence_type,
        }
    }

    /// 原文（未 trim）
    pub fn raw(&self, field: CanonicalField) -> Option<&str> {
        let slot = match field {
            CanonicalField::Code => &self.code,
            CanonicalField::Name => &self.name,
            CanonicalField::Description => &self.description,
            CanonicalField::Weight => &self.weight,
            CanonicalField::Status => &self.status,
            CanonicalField::Responsible => &self.responsible,
            CanonicalField::EvidenceType => &self.evidence_type,
        };
        slot.as_deref()
    }

    /// trim 后的值；空白视为缺失
    pub fn value(&self, field: CanonicalField) -> Option<&str> {
        self.raw(field).map(str::trim).filter(|v| !v.is_empty())
    }

    /// 写入字段：同一字段多列映射时保留第一个非空值
    pub(crate) fn set(&mut self, field: CanonicalField, value: String) {
        if value.trim().is_empty() {
            return;
        }
        let slot = self.slot_mut(field);
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// 是否没有任何已映射的值
    pub fn is_empty(&self) -> bool {
        CanonicalField::ALL.iter().all(|f| self.value(*f).is_none())
    }
}

// ==========================================
// ImportContext - 调用方固定上下文
// ==========================================
// 用途: 父级标准/组织等引用字段由调用方预先校验后统一提供，不逐行读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportContext {
    pub standard_id: String,
    pub organization_id: Option<String>,
    pub imported_by: Option<String>,
}

impl ImportContext {
    pub fn new(standard_id: impl Into<String>) -> Self {
        Self {
            standard_id: standard_id.into(),
            organization_id: None,
            imported_by: None,
        }
    }
}
