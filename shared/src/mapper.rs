use thiserror::Error;

use crate::schema::FeatureSchema;
use crate::validate::ChurnRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("model feature '{feature}' is absent from the validated request")]
    SchemaMismatch { feature: String },
}

/// Lays the request out in feature-schema order.
///
/// Looks each feature up by name, so swapping in a model with a different
/// schema needs no code change.
pub fn map_to_vector(request: &ChurnRequest, schema: &FeatureSchema) -> Result<Vec<f64>, MapError> {
    schema
        .iter()
        .map(|feature| {
            request
                .get(feature)
                .map(|value| value.as_feature())
                .ok_or_else(|| MapError::SchemaMismatch {
                    feature: feature.clone(),
                })
        })
        .collect()
}
