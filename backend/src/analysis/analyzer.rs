use std::path::PathBuf;
use std::sync::Arc;

use super::error::AnalysisError;
use super::models::{AnalysisResult, UploadedArtifact};
use crate::classification::ClassificationTable;
use crate::inference::{InferenceEngine, ModelStatus, ProbabilityVector, Preprocessor};
use crate::storage::{LocalStorage, StorageError, sanitize_filename};

const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/gif"];

/// Runs one upload through validate, persist, preprocess, predict and
/// result assembly. Each stage either hands its output to the next or ends
/// the request with a single `AnalysisError`; nothing is retried.
#[derive(Clone)]
pub struct Analyzer {
    engine: Arc<InferenceEngine>,
    storage: LocalStorage,
    preprocessor: Preprocessor,
    table: ClassificationTable,
    max_upload_bytes: u64,
}

impl Analyzer {
    pub fn new(
        engine: Arc<InferenceEngine>,
        storage: LocalStorage,
        preprocessor: Preprocessor,
        table: ClassificationTable,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            engine,
            storage,
            preprocessor,
            table,
            max_upload_bytes,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// `upload` is `None` when the request carried no file part at all.
    pub async fn analyze(
        &self,
        upload: Option<UploadedArtifact>,
    ) -> Result<AnalysisResult, AnalysisError> {
        if let ModelStatus::Unavailable(reason) = self.engine.status() {
            log::warn!("Rejecting analysis, model unavailable: {}", reason);
            return Err(AnalysisError::ModelUnavailable(reason.clone()));
        }

        let upload = upload.ok_or(AnalysisError::NoFileProvided)?;
        let original_filename = self.validate(&upload)?;

        let stored = self
            .storage
            .persist(&upload.bytes, &original_filename)
            .await
            .map_err(|e| AnalysisError::StorageWriteFailed(e.to_string()))?;

        let probabilities = self.classify(upload.bytes).await.inspect_err(|e| {
            log::error!("Analysis of {} failed: {}", stored.filename, e);
        })?;

        let (class_id, confidence) = probabilities.argmax();
        let entry = self
            .table
            .get(class_id)
            .map_err(|e| AnalysisError::InferenceFailed(e.to_string()))?;

        log::info!(
            "Analyzed {}: {} ({:.4})",
            stored.filename,
            entry.name,
            confidence
        );

        Ok(AnalysisResult::from_prediction(
            entry,
            confidence,
            &probabilities,
            &self.table,
            stored,
        ))
    }

    /// Checks presence, type and size. Returns the sanitized original filename.
    fn validate(&self, upload: &UploadedArtifact) -> Result<String, AnalysisError> {
        if upload.original_filename.trim().is_empty() || upload.declared_size == 0 {
            return Err(AnalysisError::NoFileProvided);
        }

        let original_filename = sanitize_filename(&upload.original_filename);
        LocalStorage::extract_file_extension(&original_filename)
            .map_err(|_| AnalysisError::InvalidFileType(upload.original_filename.clone()))?;

        if let Some(content_type) = upload.content_type.as_deref() {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if essence != "application/octet-stream"
                && !ALLOWED_CONTENT_TYPES.contains(&essence.as_str())
            {
                return Err(AnalysisError::InvalidFileType(content_type.to_string()));
            }
        }

        let size = upload.declared_size.max(upload.bytes.len() as u64);
        if size > self.max_upload_bytes {
            return Err(AnalysisError::FileTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        Ok(original_filename)
    }

    async fn classify(&self, bytes: Vec<u8>) -> Result<ProbabilityVector, AnalysisError> {
        let preprocessor = self.preprocessor.clone();
        let engine = self.engine.clone();

        tokio::task::spawn_blocking(move || {
            let tensor = preprocessor
                .prepare(&bytes)
                .map_err(|e| AnalysisError::UnsupportedImageFormat(e.to_string()))?;
            engine
                .predict(&tensor)
                .map_err(|e| AnalysisError::InferenceFailed(e.to_string()))
        })
        .await
        .map_err(|e| AnalysisError::InferenceFailed(e.to_string()))?
    }

    pub async fn resolve_image(&self, filename: &str) -> Result<PathBuf, AnalysisError> {
        self.storage.resolve(filename).await.map_err(|e| match e {
            StorageError::InvalidFilename => AnalysisError::InvalidFilename,
            StorageError::NotFound => AnalysisError::NotFound,
            other => {
                log::error!("Failed to resolve image {}: {}", filename, other);
                AnalysisError::NotFound
            }
        })
    }
}
