//! The ingestion pipeline.
//!
//! Composes discovery, duplicate filtering, extraction, enrichment, and
//! persistence into one linear run: `DISCOVER -> FILTER -> EXTRACT ->
//! ENRICH -> PERSIST -> DONE`. An empty result at any stage short-circuits
//! to a terminal report; it is not an error. Items are processed strictly
//! in discovery order and one item's failure never aborts the batch.

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::config::Settings;
use crate::discovery::{Discovery, PageRenderer, RendererConfig};
use crate::enrich::Enricher;
use crate::extract::DocumentFetcher;
use crate::llm::GeminiClient;
use crate::models::CandidateDocument;
use crate::repository::{SqlitePool, SummaryRepository};

/// Per-run pipeline options.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum number of new documents to process.
    pub max_documents: usize,
    /// Generate summaries via the model.
    pub summarize: bool,
    /// Persist enriched records to the store.
    pub persist: bool,
    /// Skip documents that already have a persisted summary.
    pub filter_duplicates: bool,
    /// Pause between model calls.
    pub delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_documents: 30,
            summarize: true,
            persist: true,
            filter_duplicates: true,
            delay: Duration::from_secs(1),
        }
    }
}

/// Counts aggregated over a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub discovered: usize,
    pub already_persisted: usize,
    pub extracted: usize,
    pub extraction_failed: usize,
    pub enriched: usize,
    pub enrichment_skipped: usize,
    pub persisted: usize,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  discovered:         {}", self.discovered)?;
        writeln!(f, "  already persisted:  {}", self.already_persisted)?;
        writeln!(f, "  extracted:          {}", self.extracted)?;
        writeln!(f, "  extraction failed:  {}", self.extraction_failed)?;
        writeln!(f, "  enriched:           {}", self.enriched)?;
        writeln!(f, "  enrichment skipped: {}", self.enrichment_skipped)?;
        write!(f, "  persisted:          {}", self.persisted)
    }
}

/// The pipeline orchestrator.
pub struct Pipeline {
    discovery: Discovery,
    fetcher: DocumentFetcher,
    enricher: Enricher,
    repo: SummaryRepository,
    pages: Vec<String>,
}

impl Pipeline {
    /// Build a pipeline from settings. Clients are constructed once here
    /// and owned for the life of the run; there are no ambient globals.
    pub fn new(settings: &Settings) -> Self {
        let renderer = PageRenderer::new(RendererConfig::default());
        let discovery = Discovery::new(renderer);
        let fetcher = DocumentFetcher::new(
            &settings.portal_base_url,
            Duration::from_secs(settings.request_timeout),
            Duration::from_secs(settings.head_timeout),
        );
        let enricher = Enricher::new(GeminiClient::new(settings.llm.clone()));
        let repo = SummaryRepository::new(
            SqlitePool::from_path(&settings.database_path()),
            &settings.portal_base_url,
        );

        Self {
            discovery,
            fetcher,
            enricher,
            repo,
            pages: settings.meeting_pages.clone(),
        }
    }

    /// The repository backing this pipeline.
    pub fn repository(&self) -> &SummaryRepository {
        &self.repo
    }

    /// Execute one full run.
    pub async fn run(&mut self, options: &PipelineOptions) -> PipelineReport {
        let mut report = PipelineReport::default();

        // DISCOVER
        info!("Scanning {} portal pages", self.pages.len());
        let candidates = self.discovery.discover(&self.pages).await;
        report.discovered = candidates.len();
        if candidates.is_empty() {
            info!("No documents discovered");
            return report;
        }

        // FILTER
        let selected = if options.filter_duplicates {
            let (selected, skipped) =
                select_new_candidates(&self.repo, &candidates, options.max_documents).await;
            report.already_persisted = skipped;
            selected
        } else {
            candidates
                .into_iter()
                .take(options.max_documents)
                .collect()
        };
        info!("Processing {} documents", selected.len());
        if selected.is_empty() {
            return report;
        }

        // EXTRACT
        let ids: Vec<String> = selected.iter().map(|c| c.id.clone()).collect();
        let (extracted, extract_failures) = self.fetcher.fetch_and_extract_many(&ids).await;
        report.extracted = extracted.len();
        report.extraction_failed = extract_failures.len();
        if extracted.is_empty() {
            return report;
        }

        // ENRICH
        if !options.summarize {
            info!("Summarization disabled; stopping after extraction");
            return report;
        }
        let (records, enrich_failures) =
            self.enricher.enrich_many(&extracted, options.delay).await;
        report.enriched = records.len();
        report.enrichment_skipped = enrich_failures.len();
        if records.is_empty() {
            return report;
        }

        // PERSIST
        if options.persist {
            report.persisted = self.repo.upsert_many(&records).await;
        }

        report
    }
}

/// Select up to `max_new` candidates without a persisted summary.
///
/// Scans candidates in their given (recency) order and stops as soon as
/// enough new ones are collected; the returned skip count covers only the
/// scanned prefix, which keeps re-runs picking up where previous runs left
/// off.
pub async fn select_new_candidates(
    repo: &SummaryRepository,
    candidates: &[CandidateDocument],
    max_new: usize,
) -> (Vec<CandidateDocument>, usize) {
    let mut selected = Vec::new();
    let mut skipped = 0;

    for candidate in candidates {
        if selected.len() >= max_new {
            break;
        }
        if repo.exists(&candidate.id).await {
            skipped += 1;
        } else {
            selected.push(candidate.clone());
        }
    }

    (selected, skipped)
}
