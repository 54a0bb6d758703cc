//! Database schema definitions.

diesel::table! {
    meeting_summaries (document_id) {
        document_id -> Text,
        meeting_title -> Text,
        meeting_date -> Text,
        summary -> Text,
        source_url -> Text,
        created_at -> Text,
    }
}
