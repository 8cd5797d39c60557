// ==========================================
// 认证证据导入 - 批内重复检测器实现
// ==========================================
// 职责: 检测同批次内唯一键冲突
// 规则: 按源行号顺序扫描，首次出现的行保留，之后出现的行标记为重复
// 说明: 跨批次唯一性由创建操作负责，表现为提交失败而非重复
// ==========================================

use crate::domain::evidence::{CanonicalField, EvidenceRecord};
use crate::domain::import_report::DuplicateConflict;
use crate::importer::evidence_importer_trait::DuplicateDetector as DuplicateDetectorTrait;
use std::collections::{BTreeMap, HashMap};

pub struct DuplicateDetector;

impl DuplicateDetectorTrait for DuplicateDetector {
    fn detect(
        &self,
        records: &[EvidenceRecord],
        key_field: CanonicalField,
    ) -> BTreeMap<usize, DuplicateConflict> {
        // 输入顺序不影响结果：始终以行号小者为首次出现
        let mut ordered: Vec<&EvidenceRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.row_index);

        let mut first_occurrence: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = BTreeMap::new();

        for record in ordered {
            // 空键不参与去重（由必填规则负责）
            let Some(key) = record.value(key_field) else {
                continue;
            };

            match first_occurrence.get(key) {
                Some(&first_row_index) => {
                    duplicates.insert(
                        record.row_index,
                        DuplicateConflict {
                            first_row_index,
                            key: key.to_string(),
                        },
                    );
                }
                None => {
                    first_occurrence.insert(key, record.row_index);
                }
            }
        }

        duplicates
    }
}
