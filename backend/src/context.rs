use crate::config::AppConfig;
use crate::error::{ApiError, StartupError};
use crate::inference_log::InferenceLogger;
use crate::model::{ChurnModel, ForestModel, Predictor};
use shared::{map_to_vector, validate, FeatureSchema, PredictionResponse, RawRequest, RequestSchema};
use std::path::Path;
use std::sync::Arc;

/// Everything a request handler needs, loaded once at startup and shared
/// read-only between workers. The inference log is the only mutable part and
/// serialises its own writes.
pub struct AppContext {
    features: FeatureSchema,
    request_schema: RequestSchema,
    predictor: Predictor,
    logger: Option<Arc<InferenceLogger>>,
}

impl AppContext {
    pub fn load(config: &AppConfig) -> Result<Self, StartupError> {
        let model = ForestModel::load(&config.model.artifact)?;
        let features = load_features(&config.model.features)?;
        let logger = config
            .inference_log
            .as_ref()
            .map(|log_config| InferenceLogger::open(&log_config.path))
            .transpose()?;
        Self::new(features, config.request_schema.clone(), Arc::new(model), logger)
    }

    /// Checks that the request schema, feature schema and model agree.
    pub fn new(
        features: FeatureSchema,
        request_schema: RequestSchema,
        model: Arc<dyn ChurnModel>,
        logger: Option<InferenceLogger>,
    ) -> Result<Self, StartupError> {
        request_schema.check_covers(&features)?;
        if features.len() != model.n_features() {
            return Err(StartupError::FeatureCount {
                schema: features.len(),
                model: model.n_features(),
            });
        }
        Ok(Self {
            features,
            request_schema,
            predictor: Predictor::new(model),
            logger: logger.map(Arc::new),
        })
    }

    /// Validate, map and predict. Nothing reaches the model unless the whole
    /// request validated.
    pub fn infer(&self, raw: &RawRequest) -> Result<PredictionResponse, ApiError> {
        let request = validate(raw, &self.request_schema)?;
        let vector = map_to_vector(&request, &self.features)?;
        let prediction = self.predictor.predict(&vector)?;
        Ok(PredictionResponse::new(prediction.label, prediction.probability))
    }

    pub fn logger(&self) -> Option<&Arc<InferenceLogger>> {
        self.logger.as_ref()
    }

    pub fn model_name(&self) -> &str {
        self.predictor.model_name()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn shutdown(&self) {
        if let Some(logger) = &self.logger {
            match logger.sync() {
                Ok(()) => log::info!("Inference log synced: {}", logger.path().display()),
                Err(e) => log::warn!("Failed to sync inference log: {}", e),
            }
        }
        log::info!("Churn service stopped (model '{}')", self.model_name());
    }
}

fn load_features(path: &Path) -> Result<FeatureSchema, StartupError> {
    let json = std::fs::read_to_string(path).map_err(|source| StartupError::FeatureFile {
        path: path.display().to_string(),
        source,
    })?;
    let features = FeatureSchema::from_json(&json)?;
    log::info!("Loaded {} features from {}", features.len(), path.display());
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InferenceLogConfig, ModelConfig, ServerConfig};
    use crate::test_support;
    use serde_json::json;
    use shared::SchemaError;

    #[test]
    fn test_infer_valid_payload() {
        let context = test_support::demo_context(None);
        let response = context.infer(&test_support::valid_payload()).unwrap();
        assert!(response.churn_prediction <= 1);
        assert!((0.0..=1.0).contains(&response.churn_probability));
    }

    #[test]
    fn test_infer_is_deterministic() {
        let context = test_support::demo_context(None);
        let first = context.infer(&test_support::valid_payload()).unwrap();
        let second = context.infer(&test_support::valid_payload()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_demo_forest_prediction() {
        // Contract "One year", fiber without tech support, card payment, tenure 24.
        let context = test_support::demo_context(None);
        let response = context.infer(&test_support::valid_payload()).unwrap();
        assert_eq!(response.churn_prediction, 0);
        assert_eq!(response.churn_probability, 0.3315);
    }

    #[test]
    fn test_validation_runs_before_model() {
        let context = test_support::demo_context(None);
        let mut payload = test_support::valid_payload();
        payload.remove("gender");
        assert!(matches!(context.infer(&payload), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_undeclared_feature_rejected() {
        let features = FeatureSchema::new(vec!["tenure".into(), "customerID".into()]).unwrap();
        let err = AppContext::new(
            features,
            RequestSchema::human_friendly(),
            test_support::demo_model(),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            StartupError::Schema(SchemaError::UndeclaredFeature(name)) if name == "customerID"
        ));
    }

    #[test]
    fn test_feature_count_must_match_model() {
        let features = FeatureSchema::new(vec!["tenure".into(), "gender".into()]).unwrap();
        let err = AppContext::new(
            features,
            RequestSchema::human_friendly(),
            test_support::demo_model(),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, StartupError::FeatureCount { schema: 2, model: 19 }));
    }

    #[test]
    fn test_load_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("forest.json");
        let features = dir.path().join("features.json");
        std::fs::write(&artifact, test_support::DEMO_FOREST).unwrap();
        std::fs::write(&features, test_support::DEMO_FEATURES).unwrap();

        let config = AppConfig {
            server: ServerConfig::default(),
            model: ModelConfig { artifact, features },
            inference_log: Some(InferenceLogConfig {
                path: dir.path().join("inference_log.csv"),
            }),
            request_schema: RequestSchema::human_friendly(),
        };
        let context = AppContext::load(&config).unwrap();
        assert_eq!(context.model_name(), "churn_random_forest");
        assert_eq!(context.feature_count(), 19);
        assert!(context.logger().is_some());
        context.shutdown();
    }

    #[test]
    fn test_load_missing_features_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("forest.json");
        std::fs::write(&artifact, test_support::DEMO_FOREST).unwrap();
        let config = AppConfig {
            server: ServerConfig::default(),
            model: ModelConfig {
                artifact,
                features: dir.path().join("missing.json"),
            },
            inference_log: None,
            request_schema: RequestSchema::human_friendly(),
        };
        assert!(matches!(
            AppContext::load(&config),
            Err(StartupError::FeatureFile { .. })
        ));
    }

    #[test]
    fn test_extra_fields_do_not_change_prediction() {
        let context = test_support::demo_context(None);
        let mut payload = test_support::valid_payload();
        let plain = context.infer(&payload).unwrap();
        payload.insert("random_extra_field".into(), json!("not_allowed"));
        assert_eq!(context.infer(&payload).unwrap(), plain);
    }
}
