use indexmap::IndexMap;
use shared::{AnalysisResponse, ImageInfo, Severity};

use crate::classification::{ClassificationEntry, ClassificationTable};
use crate::inference::ProbabilityVector;
use crate::storage::StoredImage;

pub const IMAGE_URL_PREFIX: &str = "/api/images";

/// One file part of an upload request, exactly as the client sent it.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub original_filename: String,
    /// Bytes received on the wire, which can exceed `bytes.len()` when the
    /// reader stopped buffering at the size limit.
    pub declared_size: u64,
}

impl UploadedArtifact {
    pub fn new(
        bytes: Vec<u8>,
        original_filename: impl Into<String>,
        content_type: Option<String>,
    ) -> Self {
        let declared_size = bytes.len() as u64;
        Self {
            bytes,
            content_type,
            original_filename: original_filename.into(),
            declared_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub diagnosis_class: u8,
    pub diagnosis: String,
    pub confidence: f32,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    pub probabilities: IndexMap<String, f32>,
    pub image: StoredImage,
}

impl AnalysisResult {
    pub fn from_prediction(
        entry: &ClassificationEntry,
        confidence: f32,
        probabilities: &ProbabilityVector,
        table: &ClassificationTable,
        image: StoredImage,
    ) -> Self {
        let probabilities = table
            .all()
            .iter()
            .zip(probabilities.values())
            .map(|(class, value)| (class.name.to_string(), *value))
            .collect();

        Self {
            diagnosis_class: entry.id,
            diagnosis: entry.name.to_string(),
            confidence,
            severity: entry.severity,
            description: entry.description.to_string(),
            recommendation: entry.recommendation.to_string(),
            probabilities,
            image,
        }
    }

    pub fn to_response(&self) -> AnalysisResponse {
        AnalysisResponse {
            success: true,
            diagnosis_class: self.diagnosis_class,
            diagnosis: self.diagnosis.clone(),
            confidence: self.confidence,
            severity: self.severity,
            description: self.description.clone(),
            recommendation: self.recommendation.clone(),
            probabilities: self.probabilities.clone(),
            image: ImageInfo {
                filename: self.image.filename.clone(),
                original_filename: self.image.original_filename.clone(),
                url: format!("{}/{}", IMAGE_URL_PREFIX, self.image.filename),
                upload_time: self.image.uploaded_at.to_rfc3339(),
            },
        }
    }
}
