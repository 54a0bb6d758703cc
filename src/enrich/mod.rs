//! Metadata and summary enrichment via the generative model.
//!
//! Builds the extraction prompt, calls the model, and validates the
//! response before constructing an [`EnrichedRecord`]. The model's output
//! is untrusted text: a response is accepted only if it parses as JSON and
//! carries a non-empty title and date. Anything else is a skip with a
//! recorded reason, never a panic.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::discovery::dates::infer_date;
use crate::extract::text::truncate_for_prompt;
use crate::llm::GeminiClient;
use crate::models::{compression_ratio, EnrichedRecord, ExtractedDocument};

/// Prompt for joint title/date/summary extraction.
///
/// Uses `{filename}` and `{content}` placeholders.
pub const EXTRACTION_PROMPT: &str = r#"You are analyzing official City of London council meeting minutes for residents.

Document: {filename}

Respond with ONLY a JSON object - no prose, no markdown fences - with exactly these keys:
  "meeting_title": the canonical meeting title, e.g. "Audit Committee - 3rd Meeting"
  "meeting_date": the meeting date as YYYY-MM-DD, or null if the document does not state one
  "summary": the resident summary

Summary rules:
- Open with one sentence describing what the meeting covered
- Then 5-7 bullet points starting with "- ", each 1-2 sentences, each opening with an action verb (Approved, Rejected, Discussed, Decided)
- Cover only decisions that directly affect residents: taxes, construction, bylaws, public services
- Ignore procedural items, attendance, and administrative matters
- Use simple, non-bureaucratic language; no markdown emphasis

Meeting Minutes:
{content}"#;

/// Why a model response was rejected by the validation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The response was not valid JSON.
    JsonParseError,
    /// Title or date was absent, null, or empty.
    MissingTitleOrDate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::JsonParseError => "json_parse_error",
            SkipReason::MissingTitleOrDate => "missing_title_or_date",
        }
    }
}

/// A document that could not be enriched, kept for the pipeline report.
#[derive(Debug, Clone)]
pub struct EnrichFailure {
    pub document_id: String,
    pub reason: String,
}

/// Fields extracted from an accepted model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEnrichment {
    pub title: String,
    pub date: String,
    pub summary: String,
}

/// Enriches extracted documents through the model.
pub struct Enricher {
    client: GeminiClient,
}

impl Enricher {
    /// Create an enricher over the given client.
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Get the underlying model client.
    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    fn build_prompt(&self, cleaned_text: &str, filename: &str) -> String {
        let content = truncate_for_prompt(cleaned_text, self.client.config().max_content_chars);
        EXTRACTION_PROMPT
            .replace("{filename}", filename)
            .replace("{content}", &content)
    }

    /// Enrich one document, or report why it was skipped.
    pub async fn enrich(
        &self,
        cleaned_text: &str,
        filename: &str,
        document_id: &str,
    ) -> Result<EnrichedRecord, EnrichFailure> {
        let prompt = self.build_prompt(cleaned_text, filename);

        let response = self.client.generate(&prompt).await.map_err(|e| EnrichFailure {
            document_id: document_id.to_string(),
            reason: e.to_string(),
        })?;

        match validate_response(&response) {
            Ok(parsed) => {
                let source_char_count = cleaned_text.chars().count();
                let summary_char_count = parsed.summary.chars().count();
                Ok(EnrichedRecord {
                    id: document_id.to_string(),
                    title: parsed.title,
                    date: parsed.date,
                    summary: parsed.summary,
                    source_char_count,
                    summary_char_count,
                    compression_ratio: compression_ratio(source_char_count, summary_char_count),
                })
            }
            Err(reason) => {
                warn!("Rejected model response for {}: {}", document_id, reason.as_str());
                Err(EnrichFailure {
                    document_id: document_id.to_string(),
                    reason: reason.as_str().to_string(),
                })
            }
        }
    }

    /// Enrich a batch sequentially, pausing between model calls.
    ///
    /// The pause respects the provider's per-minute quota and is skipped
    /// after the final item; a zero delay is supported for batch and test
    /// environments.
    pub async fn enrich_many(
        &self,
        documents: &[ExtractedDocument],
        delay: Duration,
    ) -> (Vec<EnrichedRecord>, Vec<EnrichFailure>) {
        let mut records = Vec::new();
        let mut failures = Vec::new();

        for (idx, doc) in documents.iter().enumerate() {
            info!("[{}/{}] Summarizing {}", idx + 1, documents.len(), doc.filename);

            match self.enrich(&doc.cleaned_text, &doc.filename, &doc.id).await {
                Ok(record) => {
                    info!(
                        "  {} chars, {}x compression",
                        record.summary_char_count, record.compression_ratio
                    );
                    records.push(record);
                }
                Err(failure) => {
                    warn!(
                        "  Enrichment failed for {}: {}",
                        failure.document_id, failure.reason
                    );
                    failures.push(failure);
                }
            }

            if idx + 1 < documents.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        (records, failures)
    }
}

/// Strip leading/trailing code-fence markers some models wrap JSON in.
pub fn unwrap_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Validate a raw model response.
///
/// Accepted only if it parses as JSON, `meeting_title` is non-empty, and
/// `meeting_date` is present, non-null, and non-empty.
pub fn validate_response(raw: &str) -> Result<ParsedEnrichment, SkipReason> {
    let unwrapped = unwrap_code_fences(raw);
    let value: serde_json::Value =
        serde_json::from_str(unwrapped).map_err(|_| SkipReason::JsonParseError)?;

    let title = value
        .get("meeting_title")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");
    let date = value
        .get("meeting_date")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("");

    if title.is_empty() || date.is_empty() {
        return Err(SkipReason::MissingTitleOrDate);
    }

    let summary = value
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    Ok(ParsedEnrichment {
        title: title.to_string(),
        date: normalize_date(date),
        summary,
    })
}

/// Coerce a date string to `YYYY-MM-DD` where it parses; otherwise keep it.
fn normalize_date(raw: &str) -> String {
    if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return raw.to_string();
    }
    match infer_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_response() {
        let raw = r#"{"meeting_title": "Finance Committee", "meeting_date": "2024-01-01", "summary": "x"}"#;
        let parsed = validate_response(raw).unwrap();
        assert_eq!(parsed.title, "Finance Committee");
        assert_eq!(parsed.date, "2024-01-01");
        assert_eq!(parsed.summary, "x");
    }

    #[test]
    fn test_rejects_empty_title() {
        let raw = r#"{"meeting_title": "", "meeting_date": "2024-01-01", "summary": "x"}"#;
        assert_eq!(validate_response(raw), Err(SkipReason::MissingTitleOrDate));
    }

    #[test]
    fn test_rejects_null_date() {
        let raw = r#"{"meeting_title": "Finance Committee", "meeting_date": null, "summary": "x"}"#;
        assert_eq!(validate_response(raw), Err(SkipReason::MissingTitleOrDate));
    }

    #[test]
    fn test_rejects_missing_date_key() {
        let raw = r#"{"meeting_title": "Finance Committee", "summary": "x"}"#;
        assert_eq!(validate_response(raw), Err(SkipReason::MissingTitleOrDate));
    }

    #[test]
    fn test_rejects_non_json() {
        assert_eq!(
            validate_response("Here is the summary you asked for"),
            Err(SkipReason::JsonParseError)
        );
    }

    #[test]
    fn test_accepts_fenced_json() {
        let raw = "```json\n{\"meeting_title\": \"Council\", \"meeting_date\": \"2024-03-05\", \"summary\": \"y\"}\n```";
        let parsed = validate_response(raw).unwrap();
        assert_eq!(parsed.title, "Council");
        assert_eq!(parsed.date, "2024-03-05");
    }

    #[test]
    fn test_unwrap_code_fences() {
        assert_eq!(unwrap_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(unwrap_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(unwrap_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        // Unterminated fence still yields the body
        assert_eq!(unwrap_code_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-01-15"), "2024-01-15");
        assert_eq!(normalize_date("January 15, 2024"), "2024-01-15");
        assert_eq!(normalize_date("1/15/2024"), "2024-01-15");
        // Unparseable values pass through for the gate's non-empty check
        assert_eq!(normalize_date("mid-January"), "mid-January");
    }

    #[test]
    fn test_prompt_placeholders_filled() {
        let enricher = Enricher::new(GeminiClient::new(Default::default()));
        let prompt = enricher.build_prompt("minutes text", "agenda.pdf");
        assert!(prompt.contains("agenda.pdf"));
        assert!(prompt.contains("minutes text"));
        assert!(!prompt.contains("{filename}"));
        assert!(!prompt.contains("{content}"));
    }
}
