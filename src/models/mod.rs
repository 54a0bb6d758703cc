//! Data models for CityScope.

mod document;

pub use document::{
    compression_ratio, CandidateDocument, EnrichedRecord, ExtractedDocument, MeetingSummary,
    SURROUNDING_TEXT_LIMIT,
};
