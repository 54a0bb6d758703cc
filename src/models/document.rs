//! Document models for the ingestion pipeline.
//!
//! Each stage of the pipeline produces its own value object, chained by the
//! shared document identifier: a [`CandidateDocument`] found on the portal
//! becomes an [`ExtractedDocument`] once its PDF is rendered to text, an
//! [`EnrichedRecord`] once the model response passes validation, and a
//! [`MeetingSummary`] row once persisted.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of captured surrounding text, in characters.
pub const SURROUNDING_TEXT_LIMIT: usize = 300;

/// A document link discovered on a portal page, not yet fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDocument {
    /// Portal document identifier (the digits of `DocumentId=`).
    pub id: String,
    /// Visible text of the link anchor.
    pub anchor_text: String,
    /// Text of the enclosing element, used for date inference.
    pub surrounding_text: String,
    /// Best-effort publication date parsed from the surrounding text.
    pub parsed_date: Option<NaiveDate>,
}

impl CandidateDocument {
    /// Create a candidate, bounding the captured surrounding text.
    pub fn new(id: String, anchor_text: String, surrounding_text: String) -> Self {
        let surrounding_text = if surrounding_text.chars().count() > SURROUNDING_TEXT_LIMIT {
            surrounding_text.chars().take(SURROUNDING_TEXT_LIMIT).collect()
        } else {
            surrounding_text
        };
        Self {
            id,
            anchor_text,
            surrounding_text,
            parsed_date: None,
        }
    }

    /// Set the parsed date.
    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.parsed_date = date;
        self
    }

    /// The identifier as a number; higher ids are more recently published.
    pub fn numeric_id(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }
}

/// A fetched document rendered to text.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub id: String,
    /// Display filename, from Content-Disposition or synthesized.
    pub filename: String,
    /// Page text as rendered, pages joined by a blank line.
    pub raw_text: String,
    /// Raw text after the cleaning pass.
    pub cleaned_text: String,
    /// Embedded PDF metadata (may be empty).
    pub embedded_metadata: HashMap<String, String>,
    pub word_count: usize,
    pub char_count: usize,
}

impl ExtractedDocument {
    /// Create an extracted document, deriving the word and character counts.
    pub fn new(
        id: String,
        filename: String,
        raw_text: String,
        cleaned_text: String,
        embedded_metadata: HashMap<String, String>,
    ) -> Self {
        let word_count = raw_text.split_whitespace().count();
        let char_count = raw_text.chars().count();
        Self {
            id,
            filename,
            raw_text,
            cleaned_text,
            embedded_metadata,
            word_count,
            char_count,
        }
    }
}

/// A validated model extraction, ready to persist.
///
/// Never constructed unless the title and date passed the validation gate;
/// a partially-extracted result is a failure, not a degraded success.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub id: String,
    /// Canonical meeting title, non-empty.
    pub title: String,
    /// Meeting date, `YYYY-MM-DD`.
    pub date: String,
    /// Resident-facing bullet summary.
    pub summary: String,
    pub source_char_count: usize,
    pub summary_char_count: usize,
    pub compression_ratio: f64,
}

/// A persisted summary row, as served by the read API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub document_id: String,
    pub meeting_title: String,
    pub meeting_date: String,
    pub summary: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

/// Ratio of source to summary length, `0.0` for an empty summary.
pub fn compression_ratio(source_chars: usize, summary_chars: usize) -> f64 {
    if summary_chars == 0 {
        return 0.0;
    }
    let ratio = source_chars as f64 / summary_chars as f64;
    (ratio * 10.0).round() / 10.0
}
