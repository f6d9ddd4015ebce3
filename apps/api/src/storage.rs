//! Local document storage. Stored documents are handed to the scoring
//! processes by absolute path, so everything lives on the local filesystem.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File is empty")]
    EmptyFile,

    #[error("File name is empty")]
    EmptyName,

    #[error("Filename contains invalid path sequence: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True when the failure was caused by the uploaded file itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StorageError::Io(_))
    }
}

/// Document formats the scoring processes understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Detects the kind from the declared content type, falling back to the
    /// file extension when the client sent nothing useful.
    pub fn detect(content_type: Option<&str>, file_name: &str) -> Option<Self> {
        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());
        match declared.as_deref() {
            Some(PDF_CONTENT_TYPE) => return Some(Self::Pdf),
            Some(DOCX_CONTENT_TYPE) => return Some(Self::Docx),
            Some(TEXT_CONTENT_TYPE) => return Some(Self::Text),
            Some("application/octet-stream") | Some("") | None => {}
            Some(_) => return None,
        }
        match extension_of(file_name)?.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => PDF_CONTENT_TYPE,
            Self::Docx => DOCX_CONTENT_TYPE,
            Self::Text => TEXT_CONTENT_TYPE,
        }
    }
}

/// Stores uploads under one root directory with collision-free names.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Opens (creating if needed) the upload root and resolves it to an absolute path.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(dir.as_ref()).await?;
        let root = tokio::fs::canonicalize(dir.as_ref()).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under a fresh UUID name that keeps the original extension.
    /// Returns the absolute path of the stored file.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyFile);
        }
        let name = validate_file_name(original_name)?;
        let file_name = match extension_of(name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let destination = self.root.join(file_name);
        tokio::fs::write(&destination, bytes).await?;
        debug!("Stored {original_name} at {}", destination.display());
        Ok(destination)
    }

    /// Writes `text` to `<prefix><uuid><suffix>` under the root.
    pub async fn store_text(
        &self,
        text: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<PathBuf, StorageError> {
        if text.trim().is_empty() {
            return Err(StorageError::EmptyFile);
        }
        let destination = self.root.join(format!("{prefix}{}{suffix}", Uuid::new_v4()));
        tokio::fs::write(&destination, text.as_bytes()).await?;
        Ok(destination)
    }

    /// Removes a stored document. Failures are logged, never propagated.
    pub async fn remove(&self, path: &Path) {
        if !path.starts_with(&self.root) {
            warn!("Refusing to remove {} outside the upload root", path.display());
            return;
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Could not remove stored document {}: {e}", path.display());
        }
    }
}

/// Rejects empty names and path traversal sequences.
pub fn validate_file_name(name: &str) -> Result<&str, StorageError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::EmptyName);
    }
    if name.contains("..") || name.contains('\0') {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Extension after the last dot, if the dot is neither first nor last
/// and the extension is plain alphanumeric.
pub fn extension_of(name: &str) -> Option<&str> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let dot = base.rfind('.')?;
    if dot == 0 || dot == base.len() - 1 {
        return None;
    }
    let ext = &base[dot + 1..];
    ext.chars().all(|c| c.is_ascii_alphanumeric()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_preserved() {
        assert_eq!(extension_of("cv.final.PDF"), Some("PDF"));
        assert_eq!(extension_of("resume.docx"), Some("docx"));
    }

    #[test]
    fn test_no_extension_for_dotfiles_or_trailing_dot() {
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("resume."), None);
        assert_eq!(extension_of("resume"), None);
    }

    #[test]
    fn test_traversal_names_rejected() {
        assert!(matches!(
            validate_file_name("../../etc/passwd"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(validate_file_name("   "), Err(StorageError::EmptyName)));
    }

    #[test]
    fn test_detect_prefers_declared_content_type() {
        assert_eq!(
            DocumentKind::detect(Some(PDF_CONTENT_TYPE), "cv.docx"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::detect(Some("text/plain; charset=utf-8"), "job"),
            Some(DocumentKind::Text)
        );
    }

    #[test]
    fn test_detect_falls_back_to_extension() {
        assert_eq!(
            DocumentKind::detect(Some("application/octet-stream"), "cv.DOCX"),
            Some(DocumentKind::Docx)
        );
        assert_eq!(DocumentKind::detect(None, "cv.png"), None);
        assert_eq!(DocumentKind::detect(Some("image/png"), "cv.pdf"), None);
    }

    #[tokio::test]
    async fn test_store_generates_unique_names_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();

        let a = store.store("resume.pdf", b"%PDF-1.4").await.unwrap();
        let b = store.store("resume.pdf", b"%PDF-1.4").await.unwrap();

        assert_ne!(a, b);
        assert!(a.is_absolute());
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert_eq!(tokio::fs::read(&a).await.unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_store_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.store("resume.pdf", b"").await,
            Err(StorageError::EmptyFile)
        ));
    }

    #[tokio::test]
    async fn test_store_text_uses_prefix_and_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();
        let path = store
            .store_text("Senior Rust Engineer", "job-", ".txt")
            .await
            .unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("job-") && name.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_remove_ignores_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::NamedTempFile::new().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();
        store.remove(outside.path()).await;
        assert!(outside.path().exists());
    }
}
