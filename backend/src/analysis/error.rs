#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    ServiceUnavailable,
    Internal,
    NotFound,
}

/// Every way an analysis or retrieval can end without a result. Variants
/// carry operator-facing detail; `message()` is what the caller sees.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("No file provided")]
    NoFileProvided,
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),
    #[error("File too large: {size} bytes exceeds {limit}")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("Storage write failed: {0}")]
    StorageWriteFailed(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Image not found")]
    NotFound,
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::NoFileProvided
            | AnalysisError::InvalidFileType(_)
            | AnalysisError::FileTooLarge { .. }
            | AnalysisError::UnsupportedImageFormat(_)
            | AnalysisError::InvalidFilename => ErrorCategory::Input,
            AnalysisError::ModelUnavailable(_) => ErrorCategory::ServiceUnavailable,
            AnalysisError::StorageWriteFailed(_) | AnalysisError::InferenceFailed(_) => {
                ErrorCategory::Internal
            }
            AnalysisError::NotFound => ErrorCategory::NotFound,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AnalysisError::ModelUnavailable(_) => {
                "Model not loaded. Please contact administrator.".to_string()
            }
            AnalysisError::NoFileProvided => "No file provided. Please upload an image.".to_string(),
            AnalysisError::InvalidFileType(_) => {
                "Invalid file type. Allowed types: PNG, JPG, JPEG, GIF".to_string()
            }
            AnalysisError::FileTooLarge { limit, .. } => format!(
                "File too large. Maximum size is {}MB",
                limit.div_ceil(1024 * 1024)
            ),
            AnalysisError::UnsupportedImageFormat(_) => {
                "Unsupported or corrupted image. Please upload a valid PNG, JPEG or GIF image."
                    .to_string()
            }
            AnalysisError::StorageWriteFailed(_) | AnalysisError::InferenceFailed(_) => {
                "Internal server error".to_string()
            }
            AnalysisError::InvalidFilename => "Invalid image filename".to_string(),
            AnalysisError::NotFound => "Image not found".to_string(),
        }
    }
}
