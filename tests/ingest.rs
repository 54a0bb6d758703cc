//! Integration tests for persistence and duplicate filtering, run against
//! a temporary SQLite store.

use std::time::Duration;

use tempfile::tempdir;

use cityscope::models::{CandidateDocument, EnrichedRecord};
use cityscope::pipeline::select_new_candidates;
use cityscope::repository::{SqlitePool, SummaryRepository};

const PORTAL: &str = "https://pub-london.escribemeetings.com";

fn record(id: &str, title: &str) -> EnrichedRecord {
    EnrichedRecord {
        id: id.to_string(),
        title: title.to_string(),
        date: "2024-01-10".to_string(),
        summary: "Covered resident services.\n- Approved the budget.".to_string(),
        source_char_count: 1000,
        summary_char_count: 100,
        compression_ratio: 10.0,
    }
}

fn candidate(id: &str) -> CandidateDocument {
    CandidateDocument::new(id.to_string(), String::new(), String::new())
}

async fn setup_repo() -> (SummaryRepository, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let repo = SummaryRepository::new(SqlitePool::from_path(&dir.path().join("test.db")), PORTAL);
    repo.init_schema().await.unwrap();
    (repo, dir)
}

#[tokio::test]
async fn upsert_is_idempotent_per_id() {
    let (repo, _dir) = setup_repo().await;

    assert!(repo.upsert(&record("12345", "First title")).await);
    let first = repo.get_by_id("12345").await.unwrap().unwrap();

    // A later run re-discovers the same document with corrected metadata
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(repo.upsert(&record("12345", "Corrected title")).await);

    let all = repo.get_all(None).await.unwrap();
    assert_eq!(all.len(), 1, "second upsert must not create a second row");

    let updated = &all[0];
    assert_eq!(updated.meeting_title, "Corrected title");
    // The creation timestamp belongs to the first write
    assert_eq!(updated.created_at, first.created_at);
    assert!(updated.source_url.contains("DocumentId=12345"));
}

#[tokio::test]
async fn exists_reflects_persisted_rows() {
    let (repo, _dir) = setup_repo().await;

    assert!(!repo.exists("42").await);
    assert!(repo.upsert(&record("42", "Council")).await);
    assert!(repo.exists("42").await);
    assert!(!repo.exists("43").await);
}

#[tokio::test]
async fn get_all_orders_most_recent_first() {
    let (repo, _dir) = setup_repo().await;

    assert!(repo.upsert(&record("1", "Older")).await);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(repo.upsert(&record("2", "Newer")).await);

    let all = repo.get_all(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].document_id, "2");
    assert_eq!(all[1].document_id, "1");

    let limited = repo.get_all(Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].document_id, "2");
}

#[tokio::test]
async fn get_recent_windows_by_creation_time() {
    let (repo, _dir) = setup_repo().await;

    assert!(repo.upsert(&record("7", "Committee")).await);

    let recent = repo.get_recent(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].document_id, "7");
}

#[tokio::test]
async fn upsert_many_returns_success_count() {
    let (repo, _dir) = setup_repo().await;

    let records = vec![record("1", "A"), record("2", "B"), record("3", "C")];
    assert_eq!(repo.upsert_many(&records).await, 3);
    assert_eq!(repo.count().await.unwrap(), 3);

    // Re-running the same batch stays at three rows
    assert_eq!(repo.upsert_many(&records).await, 3);
    assert_eq!(repo.count().await.unwrap(), 3);
}

#[tokio::test]
async fn duplicate_filter_selects_new_in_discovery_order() {
    let (repo, _dir) = setup_repo().await;
    assert!(repo.upsert(&record("5", "Stored")).await);
    assert!(repo.upsert(&record("3", "Stored")).await);

    let candidates: Vec<_> = ["5", "4", "3", "2", "1"].iter().map(|id| candidate(id)).collect();

    let (selected, skipped) = select_new_candidates(&repo, &candidates, 3).await;

    let ids: Vec<&str> = selected.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["4", "2", "1"]);
    assert_eq!(skipped, 2);
}

#[tokio::test]
async fn duplicate_filter_counts_only_the_scanned_prefix() {
    let (repo, _dir) = setup_repo().await;
    // A duplicate past the break point must not be counted
    assert!(repo.upsert(&record("1", "Stored")).await);

    let candidates: Vec<_> = ["5", "4", "3", "2", "1"].iter().map(|id| candidate(id)).collect();

    let (selected, skipped) = select_new_candidates(&repo, &candidates, 3).await;

    let ids: Vec<&str> = selected.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["5", "4", "3"]);
    assert_eq!(skipped, 0);
}

#[tokio::test]
async fn duplicate_filter_handles_short_candidate_lists() {
    let (repo, _dir) = setup_repo().await;

    let candidates = vec![candidate("9"), candidate("8")];
    let (selected, skipped) = select_new_candidates(&repo, &candidates, 5).await;

    assert_eq!(selected.len(), 2);
    assert_eq!(skipped, 0);
}
