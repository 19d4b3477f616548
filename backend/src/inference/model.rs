use std::path::Path;
use std::sync::Arc;

use super::preprocess::Tensor;
use crate::classification::ClassificationTable;

pub const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;
const PROBABILITY_RANGE_TOLERANCE: f32 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model error: {0}")]
    ModelError(String),
    #[error("Model backend not compiled in (enable the `torch` feature)")]
    BackendUnavailable,
    #[error("Model produced {actual} outputs, classification table has {expected}")]
    OutputWidthMismatch { expected: usize, actual: usize },
    #[error("Model output is not a probability distribution: {0}")]
    InvalidDistribution(String),
}

/// Opaque pre-trained network: tensor in, one score per class out.
///
/// Implementations must tolerate concurrent calls; a backend that is not
/// thread-safe serializes internally.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &Tensor) -> Result<Vec<f32>, InferenceError>;
}

/// Class scores index-aligned with the classification table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<f32>);

impl ProbabilityVector {
    pub fn new(values: Vec<f32>, expected_len: usize) -> Result<Self, InferenceError> {
        if values.len() != expected_len {
            return Err(InferenceError::OutputWidthMismatch {
                expected: expected_len,
                actual: values.len(),
            });
        }
        if let Some((index, value)) = values.iter().enumerate().find(|(_, v)| {
            !v.is_finite()
                || **v < -PROBABILITY_RANGE_TOLERANCE
                || **v > 1.0 + PROBABILITY_RANGE_TOLERANCE
        }) {
            return Err(InferenceError::InvalidDistribution(format!(
                "value {} at index {} is outside [0, 1]",
                value, index
            )));
        }
        let sum: f32 = values.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(InferenceError::InvalidDistribution(format!(
                "values sum to {}",
                sum
            )));
        }
        Ok(Self(values))
    }

    /// Index and value of the highest score; the first maximum wins a tie.
    pub fn argmax(&self) -> (usize, f32) {
        self.0
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (index, value)| {
                if value > best.1 { (index, value) } else { best }
            })
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / total).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Ready,
    Unavailable(String),
}

/// Process-wide handle on the loaded classifier. Built once at startup and
/// shared read-only between requests.
#[derive(Clone)]
pub struct InferenceEngine {
    classifier: Option<Arc<dyn Classifier>>,
    status: ModelStatus,
    num_classes: usize,
    apply_softmax: bool,
}

impl InferenceEngine {
    /// Wraps a loaded classifier after one forward pass on `sample_input`, which must
    /// have the preprocessor's shape. The output has to be a distribution over
    /// exactly the table's classes, after softmax when `apply_softmax` is set.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        table: &ClassificationTable,
        sample_input: &Tensor,
        apply_softmax: bool,
    ) -> Result<Self, InferenceError> {
        let num_classes = table.all().len();
        let mut output = classifier.predict(sample_input)?;
        if apply_softmax {
            output = softmax(&output);
        }
        ProbabilityVector::new(output, num_classes)?;
        Ok(Self {
            classifier: Some(classifier),
            status: ModelStatus::Ready,
            num_classes,
            apply_softmax,
        })
    }

    pub fn unavailable(reason: impl Into<String>, table: &ClassificationTable) -> Self {
        Self {
            classifier: None,
            status: ModelStatus::Unavailable(reason.into()),
            num_classes: table.all().len(),
            apply_softmax: false,
        }
    }

    /// Loads the model artifact at `path`. A missing or unreadable artifact
    /// yields a not-ready engine. A build without a model backend, or a model
    /// whose startup output does not fit the table, is an error.
    pub fn load(
        path: &Path,
        table: &ClassificationTable,
        sample_input: &Tensor,
        apply_softmax: bool,
    ) -> Result<Self, InferenceError> {
        match load_classifier(path) {
            Ok(classifier) => {
                let engine = Self::new(classifier, table, sample_input, apply_softmax)?;
                log::info!("Model loaded successfully from {}", path.display());
                Ok(engine)
            }
            Err(InferenceError::BackendUnavailable) => Err(InferenceError::BackendUnavailable),
            Err(e) => {
                log::error!("Failed to load model from {}: {}", path.display(), e);
                Ok(Self::unavailable(e.to_string(), table))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ModelStatus::Ready
    }

    pub fn status(&self) -> &ModelStatus {
        &self.status
    }

    pub fn predict(&self, input: &Tensor) -> Result<ProbabilityVector, InferenceError> {
        let classifier = self.classifier.as_ref().ok_or_else(|| match &self.status {
            ModelStatus::Unavailable(reason) => InferenceError::ModelError(reason.clone()),
            ModelStatus::Ready => InferenceError::BackendUnavailable,
        })?;
        let mut output = classifier.predict(input)?;
        if self.apply_softmax {
            output = softmax(&output);
        }
        ProbabilityVector::new(output, self.num_classes)
    }
}

#[cfg(feature = "torch")]
fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>, InferenceError> {
    Ok(Arc::new(super::torch::TorchClassifier::new(path)?))
}

#[cfg(not(feature = "torch"))]
fn load_classifier(_path: &Path) -> Result<Arc<dyn Classifier>, InferenceError> {
    Err(InferenceError::BackendUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn predict(&self, _input: &Tensor) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    struct Counting(AtomicUsize);

    impl Classifier for Counting {
        fn predict(&self, _input: &Tensor) -> Result<Vec<f32>, InferenceError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.125; 8])
        }
    }

    fn sample_input() -> Tensor {
        Tensor::zeros((1, 28, 28, 3))
    }

    #[test]
    fn test_argmax_first_maximum_wins() {
        let probs = ProbabilityVector::new(vec![0.1, 0.4, 0.4, 0.1], 4).unwrap();
        assert_eq!(probs.argmax(), (1, 0.4));

        let uniform = ProbabilityVector::new(vec![0.125; 8], 8).unwrap();
        assert_eq!(uniform.argmax().0, 0);
    }

    #[test]
    fn test_probability_vector_invariants() {
        assert!(matches!(
            ProbabilityVector::new(vec![0.5, 0.5], 8),
            Err(InferenceError::OutputWidthMismatch { expected: 8, actual: 2 })
        ));
        assert!(matches!(
            ProbabilityVector::new(vec![0.7, 0.7], 2),
            Err(InferenceError::InvalidDistribution(_))
        ));
        assert!(matches!(
            ProbabilityVector::new(vec![1.5, -0.5], 2),
            Err(InferenceError::InvalidDistribution(_))
        ));
        assert!(ProbabilityVector::new(vec![f32::NAN, 1.0], 2).is_err());
        assert!(ProbabilityVector::new(vec![0.3333, 0.3333, 0.3334], 3).is_ok());
    }

    #[test]
    fn test_softmax_normalizes() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_engine_rejects_output_width_mismatch() {
        let table = ClassificationTable::skin_lesions().unwrap();
        let result = InferenceEngine::new(Arc::new(Fixed(vec![0.5, 0.5])), &table, &sample_input(), false);
        assert!(matches!(
            result,
            Err(InferenceError::OutputWidthMismatch { expected: 8, actual: 2 })
        ));
    }

    #[test]
    fn test_engine_applies_softmax_when_configured() {
        let table = ClassificationTable::skin_lesions().unwrap();
        let logits = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0];
        let engine = InferenceEngine::new(Arc::new(Fixed(logits)), &table, &sample_input(), true).unwrap();
        let probs = engine.predict(&sample_input()).unwrap();
        assert_eq!(probs.argmax().0, 6);
        let sum: f32 = probs.values().iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_unavailable_engine_never_calls_model() {
        let table = ClassificationTable::skin_lesions().unwrap();
        let engine = InferenceEngine::unavailable("no artifact", &table);
        assert!(!engine.is_ready());
        assert!(engine.predict(&sample_input()).is_err());
    }

    #[test]
    fn test_startup_check_runs_once() {
        let table = ClassificationTable::skin_lesions().unwrap();
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let engine = InferenceEngine::new(counting.clone(), &table, &sample_input(), false).unwrap();
        assert!(engine.is_ready());
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
        engine.predict(&sample_input()).unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_engine_rejects_logits_without_softmax() {
        let table = ClassificationTable::skin_lesions().unwrap();
        let logits = vec![-1.2, 0.4, 2.5, -0.3, 1.1, 0.0, 3.7, -2.0];
        let result = InferenceEngine::new(Arc::new(Fixed(logits)), &table, &sample_input(), false);
        assert!(matches!(result, Err(InferenceError::InvalidDistribution(_))));
    }

    #[cfg(not(feature = "torch"))]
    #[test]
    fn test_load_without_backend_fails_even_with_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("skin_cancer.pt");
        std::fs::write(&artifact, b"torchscript archive").unwrap();

        let table = ClassificationTable::skin_lesions().unwrap();
        let result = InferenceEngine::load(&artifact, &table, &sample_input(), false);
        assert!(matches!(result, Err(InferenceError::BackendUnavailable)));
    }

    #[cfg(feature = "torch")]
    #[test]
    fn test_load_missing_artifact_is_not_ready() {
        let table = ClassificationTable::skin_lesions().unwrap();
        let engine =
            InferenceEngine::load(Path::new("models/missing.pt"), &table, &sample_input(), false).unwrap();
        assert!(!engine.is_ready());
        assert!(matches!(engine.status(), ModelStatus::Unavailable(_)));
    }
}
