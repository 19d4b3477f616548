pub mod model;
pub mod preprocess;
#[cfg(feature = "torch")]
pub mod torch;

pub use model::{Classifier, InferenceEngine, InferenceError, ModelStatus, ProbabilityVector};
pub use preprocess::{PreprocessError, Preprocessor, Tensor};
