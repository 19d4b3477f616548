pub mod analyzer;
pub mod error;
pub mod models;

pub use analyzer::Analyzer;
pub use error::{AnalysisError, ErrorCategory};
pub use models::{AnalysisResult, UploadedArtifact};
