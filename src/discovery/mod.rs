//! Discovery of candidate meeting documents on the portal.
//!
//! Scans rendered portal pages for links into the document stream
//! (`FileStream.ashx?DocumentId=...`), captures the anchor and enclosing
//! text for date inference, and merges results across pages by identifier.

pub mod browser;
pub mod dates;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use crate::models::CandidateDocument;

pub use browser::{PageRenderer, RendererConfig};

/// Identifier pattern in document-stream link targets.
static DOCUMENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DocumentId=(\d+)").unwrap());

/// Marker distinguishing document-stream links from ordinary navigation.
const FILE_STREAM_MARKER: &str = "FileStream.ashx";

/// Discovers candidate documents across a set of portal pages.
pub struct Discovery {
    renderer: PageRenderer,
}

impl Discovery {
    /// Create a discovery over the given page renderer.
    pub fn new(renderer: PageRenderer) -> Self {
        Self { renderer }
    }

    /// Scan the given pages and return merged candidates in recency order.
    ///
    /// A page that fails to render contributes zero candidates and does not
    /// abort discovery of the remaining pages.
    pub async fn discover(&mut self, page_urls: &[String]) -> Vec<CandidateDocument> {
        let mut pages = Vec::with_capacity(page_urls.len());

        for url in page_urls {
            match self.renderer.render(url).await {
                Ok(html) => {
                    let found = parse_candidates(&html);
                    info!("{}: {} document links", url, found.len());
                    pages.push(found);
                }
                Err(e) => {
                    warn!("Discovery failed for {}: {}", url, e);
                }
            }
        }

        let mut merged = merge_candidates(pages);
        sort_by_recency(&mut merged);
        merged
    }
}

/// Extract candidate documents from page markup.
pub fn parse_candidates(html: &str) -> Vec<CandidateDocument> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").unwrap();

    let mut candidates = Vec::new();
    for element in document.select(&anchors) {
        let href = match element.value().attr("href") {
            Some(h) if h.contains(FILE_STREAM_MARKER) => h,
            _ => continue,
        };
        let id = match DOCUMENT_ID_RE.captures(href) {
            Some(caps) => caps[1].to_string(),
            None => continue,
        };

        let anchor_text = normalize_whitespace(&element.text().collect::<String>());
        let surrounding_text = enclosing_text(&element);
        let parsed_date = dates::infer_date(&surrounding_text)
            .or_else(|| dates::infer_date(&anchor_text));

        candidates.push(
            CandidateDocument::new(id, anchor_text, surrounding_text).with_date(parsed_date),
        );
    }

    candidates
}

/// Text of the element enclosing an anchor, whitespace-normalized.
fn enclosing_text(element: &ElementRef) -> String {
    let text = element
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| parent.text().collect::<String>())
        .unwrap_or_else(|| element.text().collect::<String>());
    normalize_whitespace(&text)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Merge per-page results by identifier (set semantics).
///
/// A document discovered on two pages counts once; a dated sighting wins
/// over an undated one for the same identifier.
pub fn merge_candidates(pages: Vec<Vec<CandidateDocument>>) -> Vec<CandidateDocument> {
    let mut by_id: HashMap<String, CandidateDocument> = HashMap::new();

    for candidate in pages.into_iter().flatten() {
        match by_id.get(&candidate.id) {
            Some(existing) if existing.parsed_date.is_some() || candidate.parsed_date.is_none() => {
            }
            _ => {
                by_id.insert(candidate.id.clone(), candidate);
            }
        }
    }

    by_id.into_values().collect()
}

/// Sort candidates most-recent-first: dated documents by descending date,
/// then undated documents by descending numeric identifier.
pub fn sort_by_recency(candidates: &mut [CandidateDocument]) {
    candidates.sort_by(|a, b| match (&a.parsed_date, &b.parsed_date) {
        (Some(da), Some(db)) => db.cmp(da).then_with(|| b.numeric_id().cmp(&a.numeric_id())),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.numeric_id().cmp(&a.numeric_id()),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PAGE: &str = r#"
        <html><body>
          <div class="meeting">
            <span>Audit Committee - January 10, 2024</span>
            <a href="FileStream.ashx?DocumentId=12345">Agenda</a>
          </div>
          <div class="meeting">
            <a href="https://pub-london.escribemeetings.com/FileStream.ashx?DocumentId=12001&Type=A">Minutes</a>
          </div>
          <a href="/?MeetingViewId=2">Other view</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_candidates() {
        let candidates = parse_candidates(PAGE);
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].id, "12345");
        assert_eq!(candidates[0].anchor_text, "Agenda");
        assert!(candidates[0].surrounding_text.contains("Audit Committee"));
        assert_eq!(
            candidates[0].parsed_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
        );

        assert_eq!(candidates[1].id, "12001");
        assert_eq!(candidates[1].parsed_date, None);
    }

    #[test]
    fn test_parse_ignores_non_stream_links() {
        let candidates = parse_candidates(r#"<a href="/?MeetingViewId=2">view</a>"#);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_merge_deduplicates_across_pages() {
        let a = vec![CandidateDocument::new(
            "12345".into(),
            "Agenda".into(),
            String::new(),
        )];
        let b = vec![
            CandidateDocument::new("12345".into(), "Agenda".into(), String::new()),
            CandidateDocument::new("99".into(), "Minutes".into(), String::new()),
        ];

        let merged = merge_candidates(vec![a, b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.iter().filter(|c| c.id == "12345").count(), 1);
    }

    #[test]
    fn test_merge_prefers_dated_sighting() {
        let undated = CandidateDocument::new("7".into(), String::new(), String::new());
        let dated = CandidateDocument::new("7".into(), String::new(), String::new())
            .with_date(NaiveDate::from_ymd_opt(2024, 3, 1));

        let merged = merge_candidates(vec![vec![undated], vec![dated]]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].parsed_date.is_some());
    }

    #[test]
    fn test_recency_order() {
        let mut candidates = vec![
            CandidateDocument::new("3".into(), String::new(), String::new())
                .with_date(NaiveDate::from_ymd_opt(2024, 1, 10)),
            CandidateDocument::new("9".into(), String::new(), String::new()),
            CandidateDocument::new("1".into(), String::new(), String::new())
                .with_date(NaiveDate::from_ymd_opt(2024, 2, 1)),
        ];

        sort_by_recency(&mut candidates);

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "9"]);
    }

    #[test]
    fn test_undated_sorted_by_numeric_id() {
        let mut candidates = vec![
            CandidateDocument::new("99".into(), String::new(), String::new()),
            CandidateDocument::new("100".into(), String::new(), String::new()),
            CandidateDocument::new("12".into(), String::new(), String::new()),
        ];

        sort_by_recency(&mut candidates);

        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "99", "12"]);
    }
}
