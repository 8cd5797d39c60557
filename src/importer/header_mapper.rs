// ==========================================
// 认证证据导入 - 表头映射器实现
// ==========================================
// 职责: 源表头（多语言/同义词）→ 标准字段 + 数据行 → 记录
// 规则: 表头规范化后查同义词表；未知表头忽略，不报错
// ==========================================

use crate::config::import_profile::{normalize_header, ImportProfile};
use crate::domain::evidence::{CanonicalField, EvidenceRecord, FieldMapping, RawRow};
use crate::importer::evidence_importer_trait::HeaderMapper as HeaderMapperTrait;
use std::collections::HashMap;
use tracing::debug;

pub struct HeaderMapper {
    lookup: HashMap<String, CanonicalField>, // 规范化表头 → 标准字段（只读）
}

impl HeaderMapper {
    pub fn new(profile: &ImportProfile) -> Self {
        Self {
            lookup: profile.synonym_lookup(),
        }
    }

    fn resolve(&self, header: &str) -> Option<CanonicalField> {
        self.lookup.get(&normalize_header(header)).copied()
    }
}

impl HeaderMapperTrait for HeaderMapper {
    fn map(&self, headers: &[String]) -> Vec<FieldMapping> {
        let mapping: Vec<FieldMapping> = headers
            .iter()
            .enumerate()
            .map(|(column, header)| FieldMapping {
                column,
                header: header.clone(),
                target: self.resolve(header),
            })
            .collect();

        let unmapped: Vec<&str> = mapping
            .iter()
            .filter(|m| !m.is_mapped() && !m.header.trim().is_empty())
            .map(|m| m.header.as_str())
            .collect();
        if !unmapped.is_empty() {
            debug!(unmapped = ?unmapped, "忽略未识别表头");
        }

        mapping
    }

    fn apply(&self, mapping: &[FieldMapping], rows: &[RawRow]) -> Vec<EvidenceRecord> {
        rows.iter()
            .filter(|row| !row.is_blank())
            .map(|row| {
                let mut record = EvidenceRecord::new(row.row_index);
                for m in mapping {
                    if let (Some(field), Some(cell)) = (m.target, row.cells.get(m.column)) {
                        record.set(field, cell.clone());
                    }
                }
                record
            })
            .collect()
    }
}
