//! Photo upload policy
//!
//! Checks run in a fixed order and stop at the first failure. Nothing touches
//! the filesystem until [`PhotoUpload::validate`] has accepted the file.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Multipart field carrying the photo
pub const UPLOAD_FIELD: &str = "file";

/// Reasons a photo is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Please upload a file")]
    MissingFile,

    #[error("Please upload an image file")]
    NotAnImage { mime: String },

    #[error("Please upload an image less than {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// A file received from the client, held in memory until accepted
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Reject non-image content types and files over `max_size` bytes
    pub fn validate(&self, max_size: usize) -> Result<(), UploadError> {
        if !self.content_type.starts_with("image") {
            return Err(UploadError::NotAnImage {
                mime: self.content_type.clone(),
            });
        }
        if self.size() > max_size {
            return Err(UploadError::TooLarge {
                size: self.size(),
                max: max_size,
            });
        }
        Ok(())
    }

    /// Deterministic stored name: `photo_<id><original extension>`
    pub fn stored_name(&self, record_id: &str) -> String {
        let extension = Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        format!("photo_{}{}", record_id, extension)
    }

    /// Write the accepted file into `dir`, returning the stored name
    pub async fn persist(&self, dir: &Path, record_id: &str) -> std::io::Result<String> {
        let name = self.stored_name(record_id);
        tokio::fs::create_dir_all(dir).await?;
        let target: PathBuf = dir.join(&name);
        tokio::fs::write(&target, &self.bytes).await?;
        tracing::debug!(path = %target.display(), bytes = self.size(), "photo stored");
        Ok(name)
    }
}
