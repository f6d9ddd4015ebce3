//! In-process text extraction, used when `TEXT_EXTRACTOR_BACKEND=native`.
//!
//! PDF parsing is CPU-bound, so it runs inside `tokio::task::spawn_blocking`.

use std::path::Path;

use async_trait::async_trait;

use crate::scoring::stages::{StageError, TextExtractor};
use crate::storage::{extension_of, DocumentKind};

pub struct NativeTextExtractor;

#[async_trait]
impl TextExtractor for NativeTextExtractor {
    async fn extract(&self, document: &Path) -> Result<String, StageError> {
        let extension = extension_of(&document.to_string_lossy())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => {
                let bytes = tokio::fs::read(document).await?;
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| StageError::Extraction(format!("extraction task failed: {e}")))?
                    .map_err(|e| StageError::Extraction(e.to_string()))
            }
            "txt" => Ok(tokio::fs::read_to_string(document).await?),
            other => Err(StageError::Unsupported(format!(
                "no native extractor for {:?} files",
                other
            ))),
        }
    }

    /// DOCX needs the script backend.
    fn supports(&self, kind: DocumentKind) -> bool {
        matches!(kind, DocumentKind::Pdf | DocumentKind::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_is_read_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.txt");
        std::fs::write(&path, "Java developer\nAustin, TX\n").unwrap();

        let text = NativeTextExtractor.extract(&path).await.unwrap();
        assert_eq!(text, "Java developer\nAustin, TX\n");
    }

    #[tokio::test]
    async fn test_docx_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.docx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let err = NativeTextExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, StageError::Unsupported(_)));
    }

    #[test]
    fn test_supports_pdf_and_text_only() {
        assert!(NativeTextExtractor.supports(DocumentKind::Pdf));
        assert!(NativeTextExtractor.supports(DocumentKind::Text));
        assert!(!NativeTextExtractor.supports(DocumentKind::Docx));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();

        let err = NativeTextExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, StageError::Extraction(_)));
    }
}
