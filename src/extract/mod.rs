//! Document retrieval and text extraction.
//!
//! Fetches document bytes from the portal file stream, renders them to
//! page text, resolves a display filename, and applies the cleaning pass.

pub mod pdf;
pub mod text;

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::file_stream_url;
use crate::models::ExtractedDocument;

/// Failure to turn a document identifier into extracted text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Network error, timeout, or non-2xx response on fetch.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The downloaded bytes could not be rendered to text.
    #[error("decode failure: {0}")]
    Decode(String),
}

/// A failed extraction, kept for the pipeline report.
#[derive(Debug, Clone)]
pub struct ExtractFailure {
    pub document_id: String,
    pub reason: String,
}

/// Fetches documents from the portal and extracts their text.
pub struct DocumentFetcher {
    client: reqwest::Client,
    portal_base_url: String,
    head_timeout: Duration,
}

impl DocumentFetcher {
    /// Create a fetcher for the given portal.
    ///
    /// The legacy portal presents an incomplete certificate chain, so
    /// verification is disabled for this client only.
    pub fn new(portal_base_url: &str, timeout: Duration, head_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            portal_base_url: portal_base_url.to_string(),
            head_timeout,
        }
    }

    /// File-stream URL for a document identifier.
    pub fn document_url(&self, document_id: &str) -> String {
        file_stream_url(&self.portal_base_url, document_id)
    }

    /// Download the document bytes.
    async fn fetch_bytes(&self, document_id: &str) -> Result<Vec<u8>, ExtractError> {
        let url = self.document_url(document_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExtractError::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExtractError::Transport(e.to_string()))?;
        debug!(
            "Fetched DocumentId={} ({:.1} KB)",
            document_id,
            bytes.len() as f64 / 1024.0
        );
        Ok(bytes.to_vec())
    }

    /// Resolve the display filename from the Content-Disposition header.
    ///
    /// Never fails: any problem falls back to the synthesized name.
    pub async fn resolve_filename(&self, document_id: &str) -> String {
        let url = self.document_url(document_id);
        let response = self
            .client
            .head(&url)
            .timeout(self.head_timeout)
            .send()
            .await;

        if let Ok(response) = response {
            if let Some(header) = response
                .headers()
                .get("content-disposition")
                .and_then(|v| v.to_str().ok())
            {
                if let Some(filename) = parse_content_disposition_filename(header) {
                    return filename;
                }
            }
        }

        format!("doc_{}.pdf", document_id)
    }

    /// Fetch a document and extract its text and metadata.
    pub async fn fetch_and_extract(
        &self,
        document_id: &str,
    ) -> Result<ExtractedDocument, ExtractError> {
        let bytes = self.fetch_bytes(document_id).await?;

        // Stage to a temp file for the poppler tools
        let staged = tempfile::NamedTempFile::new()
            .map_err(|e| ExtractError::Decode(format!("staging failed: {}", e)))?;
        std::fs::write(staged.path(), &bytes)
            .map_err(|e| ExtractError::Decode(format!("staging failed: {}", e)))?;

        let raw_text = pdf::extract_text(staged.path())
            .map_err(|e| ExtractError::Decode(e.to_string()))?;
        if raw_text.trim().is_empty() {
            return Err(ExtractError::Decode("no text extracted".to_string()));
        }

        let embedded_metadata = match pdf::metadata(staged.path()) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("No embedded metadata for {}: {}", document_id, e);
                Default::default()
            }
        };

        let filename = self.resolve_filename(document_id).await;
        let cleaned_text = text::clean_text(&raw_text);

        Ok(ExtractedDocument::new(
            document_id.to_string(),
            filename,
            raw_text,
            cleaned_text,
            embedded_metadata,
        ))
    }

    /// Fetch and extract a batch of identifiers sequentially.
    ///
    /// Successes preserve the caller's ordering; one identifier's failure
    /// does not block the rest.
    pub async fn fetch_and_extract_many(
        &self,
        document_ids: &[String],
    ) -> (Vec<ExtractedDocument>, Vec<ExtractFailure>) {
        let mut extracted = Vec::new();
        let mut failed = Vec::new();

        for (idx, document_id) in document_ids.iter().enumerate() {
            info!(
                "[{}/{}] Extracting DocumentId={}",
                idx + 1,
                document_ids.len(),
                document_id
            );

            match self.fetch_and_extract(document_id).await {
                Ok(doc) => {
                    info!("  {} words extracted from {}", doc.word_count, doc.filename);
                    extracted.push(doc);
                }
                Err(e) => {
                    warn!("  Extraction failed for {}: {}", document_id, e);
                    failed.push(ExtractFailure {
                        document_id: document_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        (extracted, failed)
    }
}

/// Parse filename from a Content-Disposition header value.
/// Handles both `filename="name.pdf"` and `filename*=UTF-8''name.pdf` forms.
pub fn parse_content_disposition_filename(header: &str) -> Option<String> {
    // Try filename*= first (RFC 5987 encoded)
    if let Some(start) = header.find("filename*=") {
        let rest = &header[start + 10..];
        if let Some(quote_start) = rest.find("''") {
            let encoded = rest[quote_start + 2..].split([';', ' ']).next()?;
            if let Ok(decoded) = urlencoding::decode(encoded) {
                let filename = decoded.trim().to_string();
                if !filename.is_empty() {
                    return Some(filename);
                }
            }
        }
    }

    // Try filename= (standard form)
    if let Some(start) = header.find("filename=") {
        let rest = &header[start + 9..];
        let filename = if let Some(quoted) = rest.strip_prefix('"') {
            quoted.split('"').next()
        } else {
            rest.split([';', ' ']).next()
        };

        if let Some(name) = filename {
            let name = name.trim().to_string();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_quoted() {
        let header = r#"attachment; filename="Audit Committee Agenda.pdf""#;
        assert_eq!(
            parse_content_disposition_filename(header),
            Some("Audit Committee Agenda.pdf".to_string())
        );
    }

    #[test]
    fn test_content_disposition_unquoted() {
        assert_eq!(
            parse_content_disposition_filename("attachment; filename=agenda.pdf"),
            Some("agenda.pdf".to_string())
        );
    }

    #[test]
    fn test_content_disposition_rfc5987() {
        let header = "attachment; filename*=UTF-8''council%20minutes.pdf";
        assert_eq!(
            parse_content_disposition_filename(header),
            Some("council minutes.pdf".to_string())
        );
    }

    #[test]
    fn test_content_disposition_absent() {
        assert_eq!(parse_content_disposition_filename("attachment"), None);
        assert_eq!(parse_content_disposition_filename("inline"), None);
    }

    #[test]
    fn test_document_url() {
        let fetcher = DocumentFetcher::new(
            "https://pub-london.escribemeetings.com",
            Duration::from_secs(60),
            Duration::from_secs(10),
        );
        assert_eq!(
            fetcher.document_url("42"),
            "https://pub-london.escribemeetings.com/FileStream.ashx?DocumentId=42"
        );
    }
}
