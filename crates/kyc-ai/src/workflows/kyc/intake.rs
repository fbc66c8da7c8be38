use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::domain::DocumentCategory;
use crate::config::DocumentConfig;
use crate::workflows::IdSequence;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("uploaded file is empty")]
    EmptyFile,
    #[error("file is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("file type '{0}' is not allowed; upload a JPG, PNG or PDF")]
    UnsupportedExtension(String),
    #[error("unknown document category '{0}'")]
    UnknownCategory(String),
    #[error("document storage unavailable: {0}")]
    Storage(String),
}

/// Blob storage for uploaded documents.
pub trait DocumentStore: Send + Sync {
    /// Persist `bytes` under `key`, returning the public URL.
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, IntakeError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub category: DocumentCategory,
}

/// Validates uploads before handing them to the store.
pub struct DocumentIntake {
    store: Arc<dyn DocumentStore>,
    config: DocumentConfig,
    ids: IdSequence,
}

impl DocumentIntake {
    pub fn new(store: Arc<dyn DocumentStore>, config: DocumentConfig) -> Self {
        Self {
            store,
            config,
            ids: IdSequence::new("doc"),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    pub fn accept(
        &self,
        file_name: &str,
        category: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredDocument, IntakeError> {
        let category = DocumentCategory::from_code(category)
            .ok_or_else(|| IntakeError::UnknownCategory(category.to_string()))?;

        if bytes.is_empty() {
            return Err(IntakeError::EmptyFile);
        }
        if bytes.len() > self.config.max_upload_bytes {
            return Err(IntakeError::TooLarge {
                size: bytes.len(),
                limit: self.config.max_upload_bytes,
            });
        }

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(IntakeError::UnsupportedExtension(extension));
        }

        let content_type = mime_guess::from_ext(&extension)
            .first()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
            .essence_str()
            .to_string();

        let key = format!(
            "{}/{}-{}",
            category.label(),
            self.ids.next_id(),
            sanitize_file_name(file_name)
        );
        let size_bytes = bytes.len();
        let url = self.store.put(&key, bytes, &content_type)?;
        info!(%key, size_bytes, "document stored");

        Ok(StoredDocument {
            url,
            file_name: file_name.to_string(),
            content_type,
            size_bytes,
            category,
        })
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
