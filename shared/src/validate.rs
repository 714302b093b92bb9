//! Turns an untyped JSON body into a typed [`ChurnRequest`].
//!
//! Validation never stops at the first problem: every offending field ends up
//! in the returned [`ValidationError`]. Fields the schema does not declare are
//! ignored.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::codec::CategoryKind;
use crate::schema::{FieldSpec, RequestSchema};

/// A request body as received, before validation.
pub type RawRequest = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Category { kind: CategoryKind, code: u32 },
}

impl FieldValue {
    /// The value as the model sees it.
    pub fn as_feature(self) -> f64 {
        match self {
            FieldValue::Number(value) => value,
            FieldValue::Category { code, .. } => f64::from(code),
        }
    }
}

/// A request whose every schema field is present and well typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChurnRequest {
    values: HashMap<String, FieldValue>,
}

impl ChurnRequest {
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.values.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldIssue {
    #[error("{field}: field required")]
    MissingField { field: String },
    #[error("{field}: expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },
    #[error("{field}: unknown category '{value}', expected one of: {}", .allowed.join(", "))]
    UnknownCategory {
        field: String,
        value: String,
        allowed: Vec<&'static str>,
    },
}

impl FieldIssue {
    pub fn field(&self) -> &str {
        match self {
            FieldIssue::MissingField { field }
            | FieldIssue::TypeMismatch { field, .. }
            | FieldIssue::UnknownCategory { field, .. } => field,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FieldIssue::MissingField { .. } => "missing_field",
            FieldIssue::TypeMismatch { .. } => "type_mismatch",
            FieldIssue::UnknownCategory { .. } => "unknown_category",
        }
    }
}

/// Every field that failed validation, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(FieldIssue::field).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s): ", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

pub fn validate(raw: &RawRequest, schema: &RequestSchema) -> Result<ChurnRequest, ValidationError> {
    let mut values = HashMap::with_capacity(schema.fields().len());
    let mut issues = Vec::new();

    for spec in schema.fields() {
        let parsed = match raw.get(&spec.name) {
            None | Some(Value::Null) => Err(FieldIssue::MissingField {
                field: spec.name.clone(),
            }),
            Some(value) => parse_field(spec, value, schema.accept_encoded_categories()),
        };
        match parsed {
            Ok(value) => {
                values.insert(spec.name.clone(), value);
            }
            Err(issue) => issues.push(issue),
        }
    }

    if issues.is_empty() {
        Ok(ChurnRequest { values })
    } else {
        Err(ValidationError { issues })
    }
}

fn parse_field(spec: &FieldSpec, value: &Value, accept_codes: bool) -> Result<FieldValue, FieldIssue> {
    match spec.kind.category() {
        None => parse_number(value)
            .map(FieldValue::Number)
            .ok_or_else(|| FieldIssue::TypeMismatch {
                field: spec.name.clone(),
                expected: "a number",
                found: describe(value),
            }),
        Some(kind) => parse_category(&spec.name, kind, value, accept_codes),
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn parse_category(
    field: &str,
    kind: CategoryKind,
    value: &Value,
    accept_codes: bool,
) -> Result<FieldValue, FieldIssue> {
    let unknown = |shown: String| FieldIssue::UnknownCategory {
        field: field.to_string(),
        value: shown,
        allowed: kind.values(),
    };

    match value {
        Value::String(text) => kind
            .encode(text)
            .map(|code| FieldValue::Category { kind, code })
            .map_err(|_| unknown(text.clone())),
        Value::Number(n) if accept_codes => n
            .as_u64()
            .and_then(|code| u32::try_from(code).ok())
            .filter(|code| kind.decode(*code).is_ok())
            .map(|code| FieldValue::Category { kind, code })
            .ok_or_else(|| unknown(n.to_string())),
        other => Err(FieldIssue::TypeMismatch {
            field: field.to_string(),
            expected: if accept_codes {
                "a category name or code"
            } else {
                "a category name"
            },
            found: describe(other),
        }),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => format!("boolean {flag}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(text) => format!("string '{text}'"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}
