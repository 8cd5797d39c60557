// ==========================================
// 认证证据导入 - 已入库评估指标
// ==========================================
// 职责: 提交成功后持久化的指标实体（导出/回读使用）
// ==========================================

use crate::domain::evidence::{CanonicalField, EvidenceRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCriterion {
    // ===== 主键与归属 =====
    pub criterion_id: String,            // UUID
    pub standard_id: String,             // 所属标准（调用方上下文）
    pub organization_id: Option<String>, // 所属组织

    // ===== 业务字段 =====
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub status: Option<String>,
    pub responsible: Option<String>,
    pub evidence_type: Option<String>,

    // ===== 审计字段 =====
    pub imported_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EvidenceCriterion {
    /// 转回导入记录（导出文件可原样再次导入）
    pub fn to_record(&self, row_index: usize) -> EvidenceRecord {
        let mut record = EvidenceRecord::new(row_index)
            .with(CanonicalField::Code, self.code.as_str())
            .with(CanonicalField::Name, self.name.as_str());
        let optional = [
            (CanonicalField::Description, self.description.clone()),
            (CanonicalField::Weight, self.weight.map(|w| w.to_string())),
            (CanonicalField::Status, self.status.clone()),
            (CanonicalField::Responsible, self.responsible.clone()),
            (CanonicalField::EvidenceType, self.evidence_type.clone()),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                record = record.with(field, value);
            }
        }
        record
    }
}
