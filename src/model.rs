use crate::dataset::{Label, Sample};
use crate::features::{extract_features, FEATURE_NAMES, FEATURE_SET_VERSION};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// p(malicious) at or above this classifies as malicious.
const MALICIOUS_THRESHOLD: f64 = 0.5;

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model file not found: {0} (run --train first)")]
    NotFound(String),
    #[error("model was built with feature set v{found}, this build expects v{expected}")]
    FeatureSetMismatch { expected: u32, found: u32 },
    #[error("model feature columns do not match this build's feature order")]
    FeatureOrderMismatch,
    #[error("training data must contain both benign and malicious samples")]
    SingleClass,
    #[error("training failed: {0}")]
    Training(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Classification outcome for one URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the predicted class.
    pub confidence: f64,
}

/// Random-forest URL classifier plus the feature-contract metadata that
/// makes saved models refuse to run against a different extractor.
#[derive(Serialize, Deserialize)]
pub struct UrlClassifier {
    feature_set_version: u32,
    feature_names: Vec<String>,
    forest: Forest,
}

impl UrlClassifier {
    /// Train a forest on labeled URLs. The data must contain both classes.
    pub fn train(samples: &[Sample]) -> Result<Self, ModelError> {
        let has_benign = samples.iter().any(|s| s.label == Label::Benign);
        let has_malicious = samples.iter().any(|s| s.label == Label::Malicious);
        if !has_benign || !has_malicious {
            return Err(ModelError::SingleClass);
        }

        let rows: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| extract_features(&s.url).to_vector())
            .collect();
        let x = DenseMatrix::from_2d_vec(&rows).map_err(|e| ModelError::Training(e.to_string()))?;
        let y: Vec<u32> = samples.iter().map(|s| s.label.as_class()).collect();

        // 200 trees, fixed seed: retraining the same data reproduces the
        // same model.
        let params = RandomForestClassifierParameters::default()
            .with_n_trees(200)
            .with_seed(42);
        let forest = RandomForestClassifier::fit(&x, &y, params)
            .map_err(|e| ModelError::Training(e.to_string()))?;

        log::info!(
            "trained random forest over {} samples ({} features)",
            samples.len(),
            FEATURE_NAMES.len()
        );

        Ok(Self {
            feature_set_version: FEATURE_SET_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            forest,
        })
    }

    /// Classify one URL, returning the label and the probability of the
    /// predicted class.
    pub fn predict(&self, text: &str) -> Result<Prediction, ModelError> {
        let vector = extract_features(text).to_vector();
        let x = DenseMatrix::from_2d_vec(&vec![vector])
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let probabilities = self
            .forest
            .predict_proba(&x)
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        // Columns follow ascending class order: 0 = benign, 1 = malicious
        let p_malicious = *probabilities.get((0, 1));

        let prediction = if p_malicious >= MALICIOUS_THRESHOLD {
            Prediction {
                label: Label::Malicious,
                confidence: p_malicious,
            }
        } else {
            Prediction {
                label: Label::Benign,
                confidence: 1.0 - p_malicious,
            }
        };
        Ok(prediction)
    }

    /// Serialize the model (forest + feature contract) to a JSON file,
    /// creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        log::info!("saved model to {}", path.display());
        Ok(())
    }

    /// Load a saved model, verifying its feature contract against this
    /// build's extractor.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let model: UrlClassifier = serde_json::from_reader(BufReader::new(file))?;

        if model.feature_set_version != FEATURE_SET_VERSION {
            return Err(ModelError::FeatureSetMismatch {
                expected: FEATURE_SET_VERSION,
                found: model.feature_set_version,
            });
        }
        if model.feature_names != FEATURE_NAMES {
            return Err(ModelError::FeatureOrderMismatch);
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tiny two-class fixture, enough for the forest to separate the
    /// obvious cases it was trained on.
    fn seed_samples() -> Vec<Sample> {
        vec![
            Sample::new("https://www.google.com/", Label::Benign),
            Sample::new("https://github.com/login", Label::Benign),
            Sample::new("http://paypal.com.secure-update.info/verify", Label::Malicious),
            Sample::new("http://192.168.1.10/confirm", Label::Malicious),
            Sample::new("https://amazon-secure-check.com/update", Label::Malicious),
            Sample::new("http://example.com/", Label::Benign),
        ]
    }

    #[test]
    fn test_train_and_predict_training_points() {
        let model = UrlClassifier::train(&seed_samples()).unwrap();

        let benign = model.predict("https://www.google.com/").unwrap();
        assert_eq!(benign.label, Label::Benign);
        assert!(benign.confidence >= 0.5 && benign.confidence <= 1.0);

        let malicious = model.predict("http://192.168.1.10/confirm").unwrap();
        assert_eq!(malicious.label, Label::Malicious);
        assert!(malicious.confidence >= 0.5 && malicious.confidence <= 1.0);
    }

    #[test]
    fn test_single_class_training_is_rejected() {
        let samples = vec![
            Sample::new("https://a.com/", Label::Benign),
            Sample::new("https://b.com/", Label::Benign),
        ];
        assert!(matches!(
            UrlClassifier::train(&samples),
            Err(ModelError::SingleClass)
        ));
    }

    #[test]
    fn test_save_load_roundtrip_preserves_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = UrlClassifier::train(&seed_samples()).unwrap();
        model.save(&path).unwrap();
        let reloaded = UrlClassifier::load(&path).unwrap();

        for sample in seed_samples() {
            let before = model.predict(&sample.url).unwrap();
            let after = reloaded.predict(&sample.url).unwrap();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = UrlClassifier::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_load_rejects_feature_set_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = UrlClassifier::train(&seed_samples()).unwrap();
        model.save(&path).unwrap();

        // Corrupt the recorded feature-set version
        let raw = std::fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        value["feature_set_version"] = serde_json::json!(999);
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let err = UrlClassifier::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::FeatureSetMismatch { .. }));
    }
}
