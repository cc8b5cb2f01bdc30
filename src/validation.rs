//! Post-validation and repair of backend output
//!
//! The language-understanding backend is untrusted. Its JSON is passed
//! through an ordered list of rules before it may become a record.
//! Deterministic enforcement.

use crate::error::ExtractionError;
use crate::models::{Category, TaxIncomeRecord};
use crate::resolver::parse_amount;
use crate::Result;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Outcome of a single rule
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
    Unchanged,
    Repaired(Vec<String>),
    Rejected(String),
}

/// Trait for repair rules
pub trait RepairRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, fields: &mut Map<String, Value>) -> RepairOutcome;
}

/// Record plus every repair that was needed to produce it
#[derive(Debug, Clone)]
pub struct RepairReport {
    pub record: TaxIncomeRecord,
    pub repairs: Vec<String>,
}

/// Validator that enforces the record invariants
pub struct RecordValidator {
    rules: Vec<Box<dyn RepairRule>>,
}

impl RecordValidator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn RepairRule>) {
        self.rules.push(rule);
    }

    /// Validate and repair a backend value into a record
    pub fn repair(&self, value: Value) -> Result<RepairReport> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(ExtractionError::MalformedBackendOutput(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )));
            }
        };

        let mut repairs = Vec::new();

        for rule in &self.rules {
            match rule.apply(&mut fields) {
                RepairOutcome::Unchanged => {}
                RepairOutcome::Repaired(notes) => {
                    for note in notes {
                        warn!(rule = rule.name(), %note, "Backend output repaired");
                        repairs.push(format!("{}: {}", rule.name(), note));
                    }
                }
                RepairOutcome::Rejected(reason) => {
                    return Err(ExtractionError::MalformedBackendOutput(format!(
                        "{}: {}",
                        rule.name(),
                        reason
                    )));
                }
            }
        }

        let mut record = TaxIncomeRecord::default();
        for category in Category::ALL {
            let value = fields
                .get(category.field_name())
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    ExtractionError::MalformedBackendOutput(format!(
                        "{} is not numeric after repair",
                        category.field_name()
                    ))
                })?;
            record.set(category, value);
        }

        info!(
            rule_count = self.rules.len(),
            repairs = repairs.len(),
            "Backend output validated"
        );

        Ok(RepairReport { record, repairs })
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//
// ========== Repair Rules ==========
//

/// Rule: only the six category keys survive
pub struct DropUnknownKeysRule;

impl RepairRule for DropUnknownKeysRule {
    fn name(&self) -> &'static str {
        "drop_unknown_keys"
    }

    fn apply(&self, fields: &mut Map<String, Value>) -> RepairOutcome {
        let unknown: Vec<String> = fields
            .keys()
            .filter(|k| Category::from_field_name(k).is_none())
            .cloned()
            .collect();

        if unknown.is_empty() {
            return RepairOutcome::Unchanged;
        }

        for key in &unknown {
            fields.remove(key);
        }
        RepairOutcome::Repaired(unknown.into_iter().map(|k| format!("dropped {}", k)).collect())
    }
}

/// Rule: values become numbers; strings are parsed, null becomes zero
pub struct CoerceNumericRule;

impl RepairRule for CoerceNumericRule {
    fn name(&self) -> &'static str {
        "coerce_numeric"
    }

    fn apply(&self, fields: &mut Map<String, Value>) -> RepairOutcome {
        let mut notes = Vec::new();

        for (key, value) in fields.iter_mut() {
            let coerced = match value {
                Value::Number(_) => continue,
                Value::Null => 0.0,
                Value::String(s) if s.trim().is_empty() => 0.0,
                Value::String(s) => match coerce_amount(s) {
                    Some(v) => v,
                    None => {
                        return RepairOutcome::Rejected(format!("{} is not an amount: {:?}", key, s))
                    }
                },
                other => {
                    return RepairOutcome::Rejected(format!("{} is {}", key, json_kind(other)));
                }
            };

            notes.push(format!("{} coerced to {}", key, coerced));
            *value = Value::from(coerced);
        }

        if notes.is_empty() {
            RepairOutcome::Unchanged
        } else {
            RepairOutcome::Repaired(notes)
        }
    }
}

/// Plain numbers keep their sign and exponent so negatives reach the clamp;
/// amount phrases ("2.5 lakhs", "1,800,000") go through the numeral parser.
fn coerce_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    if trimmed.starts_with('-') {
        return None;
    }
    parse_amount(trimmed).ok()
}

/// Rule: every category key is present
pub struct FillMissingCategoriesRule;

impl RepairRule for FillMissingCategoriesRule {
    fn name(&self) -> &'static str {
        "fill_missing_categories"
    }

    fn apply(&self, fields: &mut Map<String, Value>) -> RepairOutcome {
        let mut notes = Vec::new();
        for category in Category::ALL {
            let key = category.field_name();
            if !fields.contains_key(key) {
                fields.insert(key.to_string(), Value::from(0.0));
                notes.push(format!("{} defaulted to 0.00", key));
            }
        }

        if notes.is_empty() {
            RepairOutcome::Unchanged
        } else {
            RepairOutcome::Repaired(notes)
        }
    }
}

/// Rule: no negative amounts
pub struct ClampNegativeRule;

impl RepairRule for ClampNegativeRule {
    fn name(&self) -> &'static str {
        "clamp_negative"
    }

    fn apply(&self, fields: &mut Map<String, Value>) -> RepairOutcome {
        let mut notes = Vec::new();
        for (key, value) in fields.iter_mut() {
            if let Some(v) = value.as_f64() {
                if v < 0.0 {
                    notes.push(format!("{} clamped from {}", key, v));
                    *value = Value::from(0.0);
                }
            }
        }

        if notes.is_empty() {
            RepairOutcome::Unchanged
        } else {
            RepairOutcome::Repaired(notes)
        }
    }
}

/// Create a validator with the standard rules, in order
pub fn create_default_validator() -> RecordValidator {
    let mut validator = RecordValidator::new();
    validator.add_rule(Box::new(DropUnknownKeysRule));
    validator.add_rule(Box::new(CoerceNumericRule));
    validator.add_rule(Box::new(FillMissingCategoriesRule));
    validator.add_rule(Box::new(ClampNegativeRule));
    validator
}

//
// ================= Tests =================
//
