use std::collections::HashSet;

use derive_more::Deref;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::CategoryKind;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("feature schema is empty")]
    Empty,
    #[error("feature '{0}' appears more than once in the feature schema")]
    DuplicateFeature(String),
    #[error("request field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("request schema declares no fields")]
    NoFields,
    #[error("feature '{0}' is not declared by the request schema")]
    UndeclaredFeature(String),
    #[error("invalid feature schema JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered feature names the model was trained on.
///
/// Position `i` of every mapped vector holds the value of `self[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Deref, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema(Vec<String>);

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateFeature(name.clone()));
            }
        }
        Ok(Self(names))
    }

    /// Parses the JSON array of names written by the training job.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let names: Vec<String> = serde_json::from_str(json)?;
        Self::new(names)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = SchemaError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Numeric,
    Contract,
    InternetService,
    PaymentMethod,
    Gender,
}

impl FieldKind {
    pub fn category(self) -> Option<CategoryKind> {
        match self {
            FieldKind::Numeric => None,
            FieldKind::Contract => Some(CategoryKind::Contract),
            FieldKind::InternetService => Some(CategoryKind::InternetService),
            FieldKind::PaymentMethod => Some(CategoryKind::PaymentMethod),
            FieldKind::Gender => Some(CategoryKind::Gender),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric,
        }
    }

    pub fn categorical(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[derive(Deserialize)]
struct RequestSchemaDef {
    #[serde(default)]
    accept_encoded_categories: bool,
    fields: Vec<FieldSpec>,
}

/// The accepted request shape: which fields are required and how each one
/// is typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RequestSchemaDef")]
pub struct RequestSchema {
    accept_encoded_categories: bool,
    fields: Vec<FieldSpec>,
}

impl TryFrom<RequestSchemaDef> for RequestSchema {
    type Error = SchemaError;

    fn try_from(def: RequestSchemaDef) -> Result<Self, Self::Error> {
        Self::new(def.fields, def.accept_encoded_categories)
    }
}

impl Default for RequestSchema {
    fn default() -> Self {
        Self::human_friendly()
    }
}

impl RequestSchema {
    pub fn new(fields: Vec<FieldSpec>, accept_encoded_categories: bool) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self {
            accept_encoded_categories,
            fields,
        })
    }

    /// The telco request shape served by the public API, with categories
    /// sent as their display strings.
    pub fn human_friendly() -> Self {
        let fields = vec![
            FieldSpec::numeric("tenure"),
            FieldSpec::numeric("MonthlyCharges"),
            FieldSpec::numeric("TotalCharges"),
            FieldSpec::categorical("Contract", FieldKind::Contract),
            FieldSpec::categorical("InternetService", FieldKind::InternetService),
            FieldSpec::numeric("OnlineSecurity"),
            FieldSpec::numeric("OnlineBackup"),
            FieldSpec::numeric("DeviceProtection"),
            FieldSpec::numeric("TechSupport"),
            FieldSpec::numeric("StreamingTV"),
            FieldSpec::numeric("StreamingMovies"),
            FieldSpec::numeric("PaperlessBilling"),
            FieldSpec::categorical("PaymentMethod", FieldKind::PaymentMethod),
            FieldSpec::numeric("SeniorCitizen"),
            FieldSpec::numeric("Partner"),
            FieldSpec::numeric("Dependents"),
            FieldSpec::numeric("PhoneService"),
            FieldSpec::numeric("MultipleLines"),
            FieldSpec::categorical("gender", FieldKind::Gender),
        ];
        Self {
            accept_encoded_categories: false,
            fields,
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn accept_encoded_categories(&self) -> bool {
        self.accept_encoded_categories
    }

    /// Fails on the first model feature that no request field provides.
    pub fn check_covers(&self, features: &FeatureSchema) -> Result<(), SchemaError> {
        match features.iter().find(|name| self.field(name).is_none()) {
            Some(name) => Err(SchemaError::UndeclaredFeature(name.clone())),
            None => Ok(()),
        }
    }
}
