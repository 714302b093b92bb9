pub mod forest;

use ndarray::ArrayView1;
use std::sync::Arc;
use thiserror::Error;

pub use forest::ForestModel;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model artifact not found at path: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Input length mismatch: model expects {expected} features, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Model returned malformed output: {0}")]
    InvalidOutput(String),
}

/// A pre-trained binary classifier over one feature row.
pub trait ChurnModel: Send + Sync {
    fn name(&self) -> &str {
        "classifier"
    }

    fn n_features(&self) -> usize;

    /// Decision function: the predicted class label.
    fn predict(&self, x: ArrayView1<'_, f64>) -> Result<i64, ModelError>;

    /// One probability per class, class 0 first.
    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<Vec<f64>, ModelError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u8,
    /// Probability of the positive ("will churn") class.
    pub probability: f64,
}

/// Checks the model's contract around every call so a misbehaving backend
/// surfaces as an error rather than a bogus response.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn ChurnModel>,
}

impl Predictor {
    pub fn new(model: Arc<dyn ChurnModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn predict(&self, vector: &[f64]) -> Result<Prediction, ModelError> {
        let expected = self.model.n_features();
        if vector.len() != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                got: vector.len(),
            });
        }
        let x = ArrayView1::from(vector);

        let label = match self.model.predict(x)? {
            0 => 0,
            1 => 1,
            other => {
                return Err(ModelError::InvalidOutput(format!(
                    "label {other} is not 0 or 1"
                )));
            }
        };

        let proba = self.model.predict_proba(x)?;
        let &[_, positive] = proba.as_slice() else {
            return Err(ModelError::InvalidOutput(format!(
                "expected 2 class probabilities, got {}",
                proba.len()
            )));
        };
        if !(0.0..=1.0).contains(&positive) {
            return Err(ModelError::InvalidOutput(format!(
                "probability {positive} outside [0, 1]"
            )));
        }

        Ok(Prediction {
            label,
            probability: positive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel {
        label: i64,
        proba: Vec<f64>,
    }

    impl ChurnModel for FixedModel {
        fn n_features(&self) -> usize {
            3
        }

        fn predict(&self, _x: ArrayView1<'_, f64>) -> Result<i64, ModelError> {
            Ok(self.label)
        }

        fn predict_proba(&self, _x: ArrayView1<'_, f64>) -> Result<Vec<f64>, ModelError> {
            Ok(self.proba.clone())
        }
    }

    fn predictor(label: i64, proba: Vec<f64>) -> Predictor {
        Predictor::new(Arc::new(FixedModel { label, proba }))
    }

    #[test]
    fn test_positive_class_probability() {
        let prediction = predictor(1, vec![0.2, 0.8]).predict(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            prediction,
            Prediction {
                label: 1,
                probability: 0.8
            }
        );
    }

    #[test]
    fn test_length_mismatch() {
        let err = predictor(0, vec![0.9, 0.1]).predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { expected: 3, got: 2 }));
        assert_eq!(
            err.to_string(),
            "Input length mismatch: model expects 3 features, got 2"
        );
    }

    #[test]
    fn test_malformed_outputs() {
        let x = [0.0, 0.0, 0.0];
        assert!(matches!(
            predictor(2, vec![0.5, 0.5]).predict(&x),
            Err(ModelError::InvalidOutput(_))
        ));
        assert!(matches!(
            predictor(1, vec![1.0]).predict(&x),
            Err(ModelError::InvalidOutput(_))
        ));
        assert!(matches!(
            predictor(1, vec![-0.5, 1.5]).predict(&x),
            Err(ModelError::InvalidOutput(_))
        ));
        assert!(matches!(
            predictor(1, vec![0.0, f64::NAN]).predict(&x),
            Err(ModelError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_default_name() {
        assert_eq!(predictor(0, vec![1.0, 0.0]).model_name(), "classifier");
    }
}
