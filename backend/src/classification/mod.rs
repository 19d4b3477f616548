use shared::{ClassificationInfo, Severity};

pub const CLASS_COUNT: usize = 8;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ClassificationError {
    #[error("Invalid class id: {0}")]
    InvalidClassId(usize),
    #[error("Classification table is empty")]
    Empty,
    #[error("Entry at position {position} has id {id}")]
    MisalignedId { position: usize, id: u8 },
    #[error("Classification table has {actual} entries, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationEntry {
    pub id: u8,
    pub name: &'static str,
    pub severity: Severity,
    pub description: &'static str,
    pub recommendation: &'static str,
}

impl ClassificationEntry {
    pub fn to_info(&self) -> ClassificationInfo {
        ClassificationInfo {
            id: self.id,
            name: self.name.to_string(),
            severity: self.severity,
            description: self.description.to_string(),
            recommendation: self.recommendation.to_string(),
        }
    }
}

// Order matches the classifier's output layer.
const SKIN_LESION_CLASSES: [ClassificationEntry; CLASS_COUNT] = [
    ClassificationEntry {
        id: 0,
        name: "Actinic keratoses and intraepithelial carcinomae",
        severity: Severity::Moderate,
        description: "Pre-cancerous skin condition that may develop into squamous cell carcinoma.",
        recommendation: "Consult a dermatologist for evaluation and treatment.",
    },
    ClassificationEntry {
        id: 1,
        name: "Basal Cell Carcinoma",
        severity: Severity::High,
        description: "The most common form of skin cancer, grows slowly and rarely spreads.",
        recommendation: "Immediate medical consultation required for proper treatment.",
    },
    ClassificationEntry {
        id: 2,
        name: "Benign Keratosis",
        severity: Severity::Low,
        description: "Non-cancerous growth, usually harmless but should be monitored.",
        recommendation: "Regular monitoring recommended. Consult dermatologist if changes occur.",
    },
    ClassificationEntry {
        id: 3,
        name: "Dermatofibroma",
        severity: Severity::Low,
        description: "Benign fibrous nodule, generally harmless.",
        recommendation: "Usually no treatment needed unless causing discomfort.",
    },
    ClassificationEntry {
        id: 4,
        name: "Melanocytic nevus",
        severity: Severity::Low,
        description: "Common mole, typically benign but should be monitored.",
        recommendation: "Monitor for changes using ABCDE method. Annual checkup recommended.",
    },
    ClassificationEntry {
        id: 5,
        name: "Vascular Lesion",
        severity: Severity::Low,
        description: "Abnormality of blood vessels, usually benign.",
        recommendation: "Consult dermatologist if rapidly changing or bleeding.",
    },
    ClassificationEntry {
        id: 6,
        name: "Melanoma",
        severity: Severity::Critical,
        description: "Most dangerous form of skin cancer. Early detection is crucial.",
        recommendation: "URGENT: Immediate consultation with dermatologist required.",
    },
    ClassificationEntry {
        id: 7,
        name: "No Cancer Detected",
        severity: Severity::None,
        description: "No signs of cancer detected in the analysis.",
        recommendation: "Continue regular self-examinations and annual dermatologist visits.",
    },
];

/// Static mapping from model output index to diagnosis metadata.
///
/// Entries are index-aligned: `entries[i].id == i` for every `i`. The table is
/// built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationTable {
    entries: &'static [ClassificationEntry],
}

impl ClassificationTable {
    pub fn skin_lesions() -> Result<Self, ClassificationError> {
        Self::from_entries(&SKIN_LESION_CLASSES)
    }

    pub fn from_entries(
        entries: &'static [ClassificationEntry],
    ) -> Result<Self, ClassificationError> {
        if entries.is_empty() {
            return Err(ClassificationError::Empty);
        }
        for (position, entry) in entries.iter().enumerate() {
            if usize::from(entry.id) != position {
                return Err(ClassificationError::MisalignedId {
                    position,
                    id: entry.id,
                });
            }
        }
        if entries.len() != CLASS_COUNT {
            return Err(ClassificationError::WrongLength {
                expected: CLASS_COUNT,
                actual: entries.len(),
            });
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: usize) -> Result<&ClassificationEntry, ClassificationError> {
        self.entries
            .get(id)
            .ok_or(ClassificationError::InvalidClassId(id))
    }

    pub fn all(&self) -> &[ClassificationEntry] {
        self.entries
    }

    pub fn to_info(&self) -> Vec<ClassificationInfo> {
        self.entries.iter().map(ClassificationEntry::to_info).collect()
    }
}
