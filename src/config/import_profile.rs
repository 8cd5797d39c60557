// ==========================================
// 认证证据导入 - 导入配置档
// ==========================================
// 职责: 表头同义词表 + 校验规则表 + 唯一键 + 提交并发设置
// 红线: 构造后只读，导入过程中不得修改
// 存储: JSON（文件或 config_kv 表）
// ==========================================

use crate::domain::evidence::CanonicalField;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// ==========================================
// RuleSpec - 校验规则声明
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    /// 必填: 存在且 trim 后非空
    Required { field: CanonicalField },
    /// 格式: 存在时必须匹配（expected 为给用户看的格式描述）
    Pattern {
        field: CanonicalField,
        pattern: String,
        expected: String,
    },
    /// 最大长度（按字符计）
    MaxLength { field: CanonicalField, max: usize },
    /// 数值闭区间 [min, max]
    NumericRange {
        field: CanonicalField,
        min: f64,
        max: f64,
    },
    /// 枚举值（区分大小写）
    OneOf {
        field: CanonicalField,
        allowed: Vec<String>,
    },
}

impl RuleSpec {
    pub fn field(&self) -> CanonicalField {
        match self {
            RuleSpec::Required { field }
            | RuleSpec::Pattern { field, .. }
            | RuleSpec::MaxLength { field, .. }
            | RuleSpec::NumericRange { field, .. }
            | RuleSpec::OneOf { field, .. } => *field,
        }
    }
}

// ==========================================
// CommitSettings - 提交阶段设置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSettings {
    pub mode: CommitMode,
    pub max_concurrency: usize,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            mode: CommitMode::Sequential,
            max_concurrency: 4,
        }
    }
}

// ==========================================
// ImportProfile - 导入配置档
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProfile {
    pub key_field: CanonicalField,
    pub synonyms: BTreeMap<CanonicalField, Vec<String>>,
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub commit: CommitSettings,
}

/// 表头规范化: trim + 折叠内部空白 + 小写
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Default for ImportProfile {
    /// 内置评估指标导入配置
    fn default() -> Self {
        use CanonicalField::*;

        let synonyms = [
            (Code, vec!["编号", "指标编号", "Code", "Criterion Code", "Código", "Codigo", "Número"]),
            (Name, vec!["名称", "指标名称", "Name", "Criterion", "Nombre", "Criterio"]),
            (Description, vec!["说明", "描述", "Description", "Descripción", "Descripcion"]),
            (Weight, vec!["权重(%)", "权重", "Weight", "Weight (%)", "Ponderación", "Ponderacion", "Peso"]),
            (Status, vec!["状态", "Status", "Estado"]),
            (Responsible, vec!["责任人", "Responsible", "Owner", "Responsable"]),
            (EvidenceType, vec!["证据类型", "Evidence Type", "Tipo de evidencia", "Tipo"]),
        ]
        .into_iter()
        .map(|(field, labels)| (field, labels.into_iter().map(String::from).collect()))
        .collect();

        let rules = vec![
            RuleSpec::Required { field: Code },
            RuleSpec::Pattern {
                field: Code,
                pattern: r"^[0-9]{1,2}$".to_string(),
                expected: "1-2 位数字 (如 05)".to_string(),
            },
            RuleSpec::Required { field: Name },
            RuleSpec::MaxLength { field: Name, max: 200 },
            RuleSpec::MaxLength {
                field: Description,
                max: 2000,
            },
            RuleSpec::NumericRange {
                field: Weight,
                min: 0.0,
                max: 100.0,
            },
            RuleSpec::OneOf {
                field: Status,
                allowed: vec!["ACTIVE".to_string(), "INACTIVE".to_string(), "DRAFT".to_string()],
            },
            RuleSpec::MaxLength {
                field: Responsible,
                max: 120,
            },
            RuleSpec::OneOf {
                field: EvidenceType,
                allowed: vec!["DOCUMENT".to_string(), "LINK".to_string(), "RECORD".to_string()],
            },
        ];

        Self {
            key_field: Code,
            synonyms,
            rules,
            commit: CommitSettings::default(),
        }
    }
}

impl ImportProfile {
    /// 从 JSON 字符串加载并校验
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        let profile: ImportProfile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// 从 JSON 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> ImportResult<String> {
        serde_json::to_string_pretty(self).map_err(ImportError::from)
    }

    /// 规范化表头 → 标准字段 查找表
    pub fn synonym_lookup(&self) -> HashMap<String, CanonicalField> {
        let mut lookup = HashMap::new();
        for (field, labels) in &self.synonyms {
            for label in labels {
                lookup.entry(normalize_header(label)).or_insert(*field);
            }
        }
        lookup
    }

    /// 模板表头: 每个已配置字段的第一个同义词
    pub fn display_header(&self, field: CanonicalField) -> Option<&str> {
        self.synonyms
            .get(&field)
            .and_then(|labels| labels.first())
            .map(String::as_str)
    }

    /// 结构校验（不可用的配置在加载时拒绝）
    pub fn validate(&self) -> ImportResult<()> {
        if self.synonyms.values().all(|labels| labels.is_empty()) {
            return Err(config_error("synonyms", "{}", "同义词表为空"));
        }

        if self
            .synonyms
            .get(&self.key_field)
            .map_or(true, |labels| labels.is_empty())
        {
            return Err(config_error(
                "key_field",
                self.key_field.as_str(),
                "唯一键字段没有任何表头同义词",
            ));
        }

        // 同一表头不能指向两个不同字段
        let mut seen: HashMap<String, CanonicalField> = HashMap::new();
        for (field, labels) in &self.synonyms {
            for label in labels {
                let normalized = normalize_header(label);
                if normalized.is_empty() {
                    return Err(config_error("synonyms", field.as_str(), "同义词不能为空白"));
                }
                if let Some(other) = seen.insert(normalized, *field) {
                    if other != *field {
                        return Err(config_error(
                            "synonyms",
                            label,
                            &format!("表头同时映射到 {} 与 {}", other, field),
                        ));
                    }
                }
            }
        }

        for rule in &self.rules {
            match rule {
                RuleSpec::Pattern { pattern, .. } => {
                    if let Err(e) = regex::Regex::new(pattern) {
                        return Err(config_error("rules.pattern", pattern, &e.to_string()));
                    }
                }
                RuleSpec::NumericRange { min, max, .. } => {
                    if !(min <= max) {
                        return Err(config_error(
                            "rules.numeric_range",
                            &format!("[{}, {}]", min, max),
                            "min 必须 <= max",
                        ));
                    }
                }
                RuleSpec::OneOf { allowed, .. } if allowed.is_empty() => {
                    return Err(config_error("rules.one_of", "[]", "枚举值列表为空"));
                }
                _ => {}
            }
        }

        if self.commit.max_concurrency == 0 {
            return Err(config_error("commit.max_concurrency", "0", "并发数必须 >= 1"));
        }

        Ok(())
    }
}

fn config_error(key: &str, value: &str, message: &str) -> ImportError {
    ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
