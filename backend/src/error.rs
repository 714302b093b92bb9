use crate::inference_log::LogError;
use crate::model::ModelError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use shared::{ErrorResponse, FieldErrorDetail, MapError, SchemaError, ValidationError};
use thiserror::Error;

/// Failures of a single `/predict` call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(#[from] MapError),

    #[error("Prediction failed: {0}")]
    Prediction(#[from] ModelError),
}

impl ApiError {
    /// Caller mistakes, as opposed to a broken model or schema contract.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::Validation(_) | ApiError::BadRequest(_))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) | ApiError::SchemaMismatch(_) | ApiError::Prediction(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let errors = match self {
            ApiError::Validation(err) => err.issues().iter().map(FieldErrorDetail::from).collect(),
            _ => Vec::new(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
            errors,
        })
    }
}

/// Anything that stops the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Log(#[from] LogError),

    #[error("Failed to read feature schema {path}: {source}")]
    FeatureFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Feature schema lists {schema} features but the model expects {model}")]
    FeatureCount { schema: usize, model: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use serde_json::json;
    use shared::{validate, RawRequest, RequestSchema};

    fn validation_error() -> ValidationError {
        let raw: RawRequest = serde_json::from_value(json!({"tenure": "soon"})).unwrap();
        validate(&raw, &RequestSchema::human_friendly()).unwrap_err()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(validation_error()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::BadRequest("EOF".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let mismatch = ApiError::from(MapError::SchemaMismatch {
            feature: "tenure".into(),
        });
        assert_eq!(mismatch.status_code(), StatusCode::BAD_REQUEST);
        assert!(!mismatch.is_client_error());

        let prediction = ApiError::from(ModelError::ShapeMismatch {
            expected: 19,
            got: 18,
        });
        assert_eq!(prediction.status_code(), StatusCode::BAD_REQUEST);
        assert!(!prediction.is_client_error());
    }

    #[actix_web::test]
    async fn test_validation_body_lists_every_field() {
        let response = ApiError::from(validation_error()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();

        assert!(body.detail.starts_with("19 invalid field(s)"));
        assert_eq!(body.errors.len(), 19);
        assert_eq!(body.errors[0].field, "tenure");
        assert_eq!(body.errors[0].kind, "type_mismatch");
        assert!(body.errors[1..].iter().all(|e| e.kind == "missing_field"));
    }

    #[actix_web::test]
    async fn test_prediction_body_has_detail_only() {
        let response = ApiError::from(ModelError::InvalidOutput("label 7 is not 0 or 1".into()))
            .error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({"detail": "Prediction failed: Model returned malformed output: label 7 is not 0 or 1"})
        );
    }
}
