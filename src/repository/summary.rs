//! Meeting summary repository.
//!
//! The store's single consistency mechanism is the keyed upsert: every
//! write is an insert-or-update on `document_id`, so re-running the
//! pipeline is always safe. There is deliberately no locking or
//! cross-stage transaction; each write is independently idempotent.

use chrono::{Duration, SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};
use tracing::error;

use super::models::{NewSummary, SummaryRecord};
use super::parse_datetime;
use super::pool::{DbError, SqlitePool};
use crate::config::file_stream_url;
use crate::models::{EnrichedRecord, MeetingSummary};
use crate::schema::meeting_summaries;

/// Repository for persisted meeting summaries.
#[derive(Clone)]
pub struct SummaryRepository {
    pool: SqlitePool,
    portal_base_url: String,
}

impl SummaryRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool, portal_base_url: &str) -> Self {
        Self {
            pool,
            portal_base_url: portal_base_url.to_string(),
        }
    }

    /// Create the schema if it does not exist yet. Idempotent.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS meeting_summaries (
                document_id TEXT PRIMARY KEY,
                meeting_title TEXT NOT NULL,
                meeting_date TEXT NOT NULL,
                summary TEXT NOT NULL,
                source_url TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_meeting_summaries_created_at
                ON meeting_summaries(created_at);
            "#,
        )
        .await?;
        Ok(())
    }

    /// Check whether a document already has a persisted summary.
    ///
    /// Store errors are reported as absence so a duplicate check never
    /// aborts a batch.
    pub async fn exists(&self, document_id: &str) -> bool {
        match self.find_id(document_id).await {
            Ok(found) => found,
            Err(e) => {
                error!("Existence check failed for {}: {}", document_id, e);
                false
            }
        }
    }

    async fn find_id(&self, document_id: &str) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;
        let found: Option<String> = meeting_summaries::table
            .filter(meeting_summaries::document_id.eq(document_id))
            .select(meeting_summaries::document_id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert or update the summary row for a record's document id.
    ///
    /// A second write for the same id replaces title, date, summary, and
    /// source URL; `created_at` keeps the first write's value. Returns
    /// whether the write succeeded.
    pub async fn upsert(&self, record: &EnrichedRecord) -> bool {
        match self.try_upsert(record).await {
            Ok(()) => true,
            Err(e) => {
                error!("Database error for {}: {}", record.id, e);
                false
            }
        }
    }

    async fn try_upsert(&self, record: &EnrichedRecord) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let source_url = file_stream_url(&self.portal_base_url, &record.id);

        diesel::insert_into(meeting_summaries::table)
            .values(NewSummary {
                document_id: &record.id,
                meeting_title: &record.title,
                meeting_date: &record.date,
                summary: &record.summary,
                source_url: &source_url,
                created_at: &now,
            })
            .on_conflict(meeting_summaries::document_id)
            .do_update()
            .set((
                meeting_summaries::meeting_title.eq(excluded(meeting_summaries::meeting_title)),
                meeting_summaries::meeting_date.eq(excluded(meeting_summaries::meeting_date)),
                meeting_summaries::summary.eq(excluded(meeting_summaries::summary)),
                meeting_summaries::source_url.eq(excluded(meeting_summaries::source_url)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Upsert a batch, continuing past failures. Returns the success count.
    pub async fn upsert_many(&self, records: &[EnrichedRecord]) -> usize {
        let mut succeeded = 0;
        for record in records {
            if self.upsert(record).await {
                succeeded += 1;
            }
        }
        succeeded
    }

    /// All summaries, most recent first.
    pub async fn get_all(&self, limit: Option<i64>) -> Result<Vec<MeetingSummary>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut query = meeting_summaries::table
            .order(meeting_summaries::created_at.desc())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let records: Vec<SummaryRecord> = query.load(&mut conn).await?;
        Ok(records.into_iter().map(record_to_summary).collect())
    }

    /// A single summary by document id.
    pub async fn get_by_id(&self, document_id: &str) -> Result<Option<MeetingSummary>, DbError> {
        let mut conn = self.pool.get().await?;

        let record: Option<SummaryRecord> = meeting_summaries::table
            .filter(meeting_summaries::document_id.eq(document_id))
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.map(record_to_summary))
    }

    /// Summaries created in the last `days` days, most recent first.
    pub async fn get_recent(&self, days: i64) -> Result<Vec<MeetingSummary>, DbError> {
        let mut conn = self.pool.get().await?;
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true);

        let records: Vec<SummaryRecord> = meeting_summaries::table
            .filter(meeting_summaries::created_at.ge(cutoff))
            .order(meeting_summaries::created_at.desc())
            .load(&mut conn)
            .await?;

        Ok(records.into_iter().map(record_to_summary).collect())
    }

    /// Count all summaries.
    pub async fn count(&self) -> Result<u64, DbError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = meeting_summaries::table
            .select(count_star())
            .first(&mut conn)
            .await?;

        Ok(count as u64)
    }
}

fn record_to_summary(record: SummaryRecord) -> MeetingSummary {
    MeetingSummary {
        document_id: record.document_id,
        meeting_title: record.meeting_title,
        meeting_date: record.meeting_date,
        summary: record.summary,
        source_url: record.source_url,
        created_at: parse_datetime(&record.created_at),
    }
}
