use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to write image: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("Failed to read image: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Invalid file extension")]
    InvalidExtension,
    #[error("Image not found")]
    NotFound,
}

/// Metadata for an image published into the upload directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub filename: String,
    pub original_filename: String,
    pub path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
}

/// Flat directory of uploaded images keyed by generated names.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(StorageError::WriteFailed)
    }

    /// Lowercased extension of `filename` if it is one of the accepted image types.
    pub fn extract_file_extension(filename: &str) -> Result<String, StorageError> {
        let (_, ext) = filename
            .rsplit_once('.')
            .ok_or(StorageError::InvalidExtension)?;
        let ext = ext.to_ascii_lowercase();
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(ext)
        } else {
            Err(StorageError::InvalidExtension)
        }
    }

    pub fn generate_filename(timestamp: DateTime<Utc>, file_extension: &str) -> String {
        format!(
            "{}_{}.{}",
            timestamp.format("%Y%m%d_%H%M%S"),
            Uuid::new_v4(),
            file_extension
        )
    }

    /// Writes `image_data` under a fresh name. The bytes land in a hidden
    /// temporary file first and are renamed into place, so readers only ever
    /// see complete files.
    pub async fn persist(
        &self,
        image_data: &[u8],
        original_filename: &str,
    ) -> Result<StoredImage, StorageError> {
        let file_extension = Self::extract_file_extension(original_filename)?;
        let uploaded_at = Utc::now();
        let filename = Self::generate_filename(uploaded_at, &file_extension);

        let final_path = self.root.join(&filename);
        let tmp_path = self.root.join(format!(".{}.part", filename));

        if let Err(e) = tokio::fs::write(&tmp_path, image_data).await {
            log::error!("Failed to write {}: {}", tmp_path.display(), e);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StorageError::WriteFailed(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            log::error!(
                "Failed to publish {} as {}: {}",
                tmp_path.display(),
                final_path.display(),
                e
            );
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StorageError::WriteFailed(e));
        }

        log::info!(
            "Stored {} ({} bytes) as {}",
            original_filename,
            image_data.len(),
            filename
        );

        Ok(StoredImage {
            filename,
            original_filename: original_filename.to_string(),
            path: final_path,
            uploaded_at,
        })
    }

    /// Maps a stored filename back to its path. Names that could escape the
    /// upload directory are refused before the filesystem is consulted.
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf, StorageError> {
        if !is_opaque_filename(filename) {
            return Err(StorageError::InvalidFilename);
        }
        let path = self.root.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StorageError::NotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
            Err(e) => Err(StorageError::ReadFailed(e)),
        }
    }

    pub async fn get_image(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(filename).await?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::ReadFailed(e),
        })
    }
}

fn is_opaque_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains("..")
        && !filename
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0'))
}

/// Reduces a client-supplied filename to a safe display form: last path
/// component, ASCII alphanumerics plus `.`, `-` and `_`, no leading dots.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
