// ==========================================
// 认证证据导入 - 记录校验器实现
// ==========================================
// 职责: 按规则表逐条校验记录
// 规则: 必填 / 格式 / 长度上限 / 数值区间 / 枚举值
// 约束: 规则相互独立、按声明顺序执行、不短路；每条规则至多产生一个错误
// ==========================================

use crate::config::import_profile::{ImportProfile, RuleSpec};
use crate::domain::evidence::{CanonicalField, EvidenceRecord};
use crate::domain::import_report::{ValidationError, ValidationErrorKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::evidence_importer_trait::RecordValidator as RecordValidatorTrait;
use regex::Regex;

// ==========================================
// ValidationRule - 单条规则
// ==========================================
pub trait ValidationRule: Send + Sync {
    fn field(&self) -> CanonicalField;

    /// 检查记录，返回 None 表示通过
    fn check(&self, record: &EvidenceRecord) -> Option<ValidationError>;
}

fn violation(
    record: &EvidenceRecord,
    field: CanonicalField,
    kind: ValidationErrorKind,
    message: String,
) -> ValidationError {
    ValidationError {
        row_index: record.row_index,
        field,
        kind,
        message,
    }
}

pub struct RequiredRule {
    pub field: CanonicalField,
}

impl ValidationRule for RequiredRule {
    fn field(&self) -> CanonicalField {
        self.field
    }

    fn check(&self, record: &EvidenceRecord) -> Option<ValidationError> {
        if record.value(self.field).is_some() {
            return None;
        }
        Some(violation(
            record,
            self.field,
            ValidationErrorKind::Required,
            format!("{} 为必填项", self.field),
        ))
    }
}

pub struct PatternRule {
    pub field: CanonicalField,
    pub regex: Regex,
    pub expected: String,
}

impl ValidationRule for PatternRule {
    fn field(&self) -> CanonicalField {
        self.field
    }

    fn check(&self, record: &EvidenceRecord) -> Option<ValidationError> {
        let value = record.value(self.field)?;
        if self.regex.is_match(value) {
            return None;
        }
        Some(violation(
            record,
            self.field,
            ValidationErrorKind::PatternMismatch {
                expected: self.expected.clone(),
            },
            format!("{} 格式错误: 期望 {}，实际 {}", self.field, self.expected, value),
        ))
    }
}

pub struct MaxLengthRule {
    pub field: CanonicalField,
    pub max: usize,
}

impl ValidationRule for MaxLengthRule {
    fn field(&self) -> CanonicalField {
        self.field
    }

    fn check(&self, record: &EvidenceRecord) -> Option<ValidationError> {
        let actual = record.value(self.field)?.chars().count();
        if actual <= self.max {
            return None;
        }
        Some(violation(
            record,
            self.field,
            ValidationErrorKind::TooLong {
                max: self.max,
                actual,
            },
            format!("{} 长度 {} 超过上限 {}", self.field, actual, self.max),
        ))
    }
}

pub struct NumericRangeRule {
    pub field: CanonicalField,
    pub min: f64,
    pub max: f64,
}

/// 解析数值：允许结尾 %，允许逗号作小数点；非有限值视为非数字
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let normalized = if trimmed.matches(',').count() == 1 && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl ValidationRule for NumericRangeRule {
    fn field(&self) -> CanonicalField {
        self.field
    }

    fn check(&self, record: &EvidenceRecord) -> Option<ValidationError> {
        let value = record.value(self.field)?;
        match parse_number(value) {
            None => Some(violation(
                record,
                self.field,
                ValidationErrorKind::NotNumeric,
                format!("{} 不是有效数字: {}", self.field, value),
            )),
            Some(n) if n < self.min || n > self.max => Some(violation(
                record,
                self.field,
                ValidationErrorKind::OutOfRange {
                    min: self.min,
                    max: self.max,
                },
                format!(
                    "{} 值 {} 超出范围 [{}, {}]",
                    self.field, value, self.min, self.max
                ),
            )),
            Some(_) => None,
        }
    }
}

pub struct OneOfRule {
    pub field: CanonicalField,
    pub allowed: Vec<String>,
}

impl ValidationRule for OneOfRule {
    fn field(&self) -> CanonicalField {
        self.field
    }

    fn check(&self, record: &EvidenceRecord) -> Option<ValidationError> {
        let value = record.value(self.field)?;
        if self.allowed.iter().any(|a| a == value) {
            return None;
        }
        Some(violation(
            record,
            self.field,
            ValidationErrorKind::NotAllowed {
                allowed: self.allowed.clone(),
            },
            format!(
                "{} 值 {} 不在允许范围: {}",
                self.field,
                value,
                self.allowed.join("/")
            ),
        ))
    }
}

// ==========================================
// RecordValidator - 规则表驱动的校验器
// ==========================================
pub struct RecordValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl RecordValidator {
    pub fn new(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// 由配置档的规则声明构建（正则在此编译）
    pub fn from_profile(profile: &ImportProfile) -> ImportResult<Self> {
        let mut rules: Vec<Box<dyn ValidationRule>> = Vec::with_capacity(profile.rules.len());

        for spec in &profile.rules {
            let rule: Box<dyn ValidationRule> = match spec {
                RuleSpec::Required { field } => Box::new(RequiredRule { field: *field }),
                RuleSpec::Pattern {
                    field,
                    pattern,
                    expected,
                } => {
                    let regex = Regex::new(pattern).map_err(|e| ImportError::ConfigValueError {
                        key: "rules.pattern".to_string(),
                        value: pattern.clone(),
                        message: e.to_string(),
                    })?;
                    Box::new(PatternRule {
                        field: *field,
                        regex,
                        expected: expected.clone(),
                    })
                }
                RuleSpec::MaxLength { field, max } => Box::new(MaxLengthRule {
                    field: *field,
                    max: *max,
                }),
                RuleSpec::NumericRange { field, min, max } => Box::new(NumericRangeRule {
                    field: *field,
                    min: *min,
                    max: *max,
                }),
                RuleSpec::OneOf { field, allowed } => Box::new(OneOfRule {
                    field: *field,
                    allowed: allowed.clone(),
                }),
            };
            rules.push(rule);
        }

        Ok(Self::new(rules))
    }
}

impl RecordValidatorTrait for RecordValidator {
    fn validate(&self, record: &EvidenceRecord) -> Vec<ValidationError> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(record))
            .collect()
    }
}
