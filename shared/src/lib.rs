use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Coarse clinical urgency bucket attached to each classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageInfo {
    pub filename: String,
    pub original_filename: String,
    pub url: String,
    pub upload_time: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalysisResponse {
    pub success: bool,
    pub diagnosis_class: u8,
    pub diagnosis: String,
    pub confidence: f32,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    pub probabilities: IndexMap<String, f32>,
    pub image: ImageInfo,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClassificationInfo {
    pub id: u8,
    pub name: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InfoResponse {
    pub success: bool,
    pub classifications: Vec<ClassificationInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub timestamp: String,
    pub version: String,
}
