//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! against a SQLite store.

pub mod models;
pub mod pool;
pub mod summary;

pub use pool::{DbError, SqlitePool};
pub use summary::SummaryRepository;

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2024-06-01T12:00:00Z");
        assert_eq!(dt.to_rfc3339(), "2024-06-01T12:00:00+00:00");
        assert_eq!(parse_datetime("not a date"), DateTime::UNIX_EPOCH);
    }
}
