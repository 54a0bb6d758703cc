//! Diesel records for the meeting summary store.

use diesel::prelude::*;

use crate::schema;

/// Summary row from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::meeting_summaries)]
#[diesel(primary_key(document_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SummaryRecord {
    pub document_id: String,
    pub meeting_title: String,
    pub meeting_date: String,
    pub summary: String,
    pub source_url: String,
    pub created_at: String,
}

/// New summary row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::meeting_summaries)]
pub struct NewSummary<'a> {
    pub document_id: &'a str,
    pub meeting_title: &'a str,
    pub meeting_date: &'a str,
    pub summary: &'a str,
    pub source_url: &'a str,
    pub created_at: &'a str,
}
