pub mod codec;
pub mod mapper;
pub mod schema;
pub mod validate;

use serde::{Deserialize, Serialize};

pub use codec::{Category, CategoryKind, CodecError};
pub use mapper::{map_to_vector, MapError};
pub use schema::{FeatureSchema, FieldKind, FieldSpec, RequestSchema, SchemaError};
pub use validate::{validate, ChurnRequest, FieldIssue, FieldValue, RawRequest, ValidationError};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResponse {
    pub churn_prediction: u8,
    pub churn_probability: f64,
}

impl PredictionResponse {
    /// Probability is rounded to four decimal places.
    pub fn new(label: u8, probability: f64) -> Self {
        Self {
            churn_prediction: label,
            churn_probability: (probability * 10_000.0).round() / 10_000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldErrorDetail {
    pub field: String,
    pub kind: String,
    pub message: String,
}

impl From<&FieldIssue> for FieldErrorDetail {
    fn from(issue: &FieldIssue) -> Self {
        Self {
            field: issue.field().to_string(),
            kind: issue.kind().to_string(),
            message: issue.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorDetail>,
}
