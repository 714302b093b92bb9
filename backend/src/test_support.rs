//! Fixtures shared by the unit tests.

use crate::context::AppContext;
use crate::inference_log::InferenceLogger;
use crate::model::{ChurnModel, ForestModel};
use serde_json::json;
use shared::{FeatureSchema, RawRequest, RequestSchema};
use std::sync::Arc;

pub const DEMO_FOREST: &str = include_str!("../../models/churn_forest.json");
pub const DEMO_FEATURES: &str = include_str!("../../models/features.json");

pub fn demo_model() -> Arc<dyn ChurnModel> {
    Arc::new(ForestModel::from_json(DEMO_FOREST).unwrap())
}

pub fn demo_context(logger: Option<InferenceLogger>) -> AppContext {
    AppContext::new(
        FeatureSchema::from_json(DEMO_FEATURES).unwrap(),
        RequestSchema::human_friendly(),
        demo_model(),
        logger,
    )
    .unwrap()
}

pub fn valid_payload() -> RawRequest {
    serde_json::from_value(json!({
        "tenure": 24,
        "MonthlyCharges": 75.25,
        "TotalCharges": 1805,
        "Contract": "One year",
        "InternetService": "Fiber optic",
        "OnlineSecurity": 0,
        "OnlineBackup": 1,
        "DeviceProtection": 0,
        "TechSupport": 0,
        "StreamingTV": 1,
        "StreamingMovies": 1,
        "PaperlessBilling": 1,
        "PaymentMethod": "Credit card (automatic)",
        "SeniorCitizen": 0,
        "Partner": 1,
        "Dependents": 0,
        "PhoneService": 1,
        "MultipleLines": 0,
        "gender": "Male"
    }))
    .unwrap()
}
