//! Batch enrichment tests against a local stub of the model endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use cityscope::enrich::Enricher;
use cityscope::llm::{GeminiClient, GeminiConfig};
use cityscope::models::ExtractedDocument;

/// Serve a Gemini-shaped response whose text depends on the call number:
/// the second call returns prose that fails the JSON validation gate.
async fn generate(State(calls): State<Arc<AtomicUsize>>) -> Json<serde_json::Value> {
    let call = calls.fetch_add(1, Ordering::SeqCst);

    let text = if call == 1 {
        "Sorry, I cannot summarize this document.".to_string()
    } else {
        json!({
            "meeting_title": format!("Meeting {}", call),
            "meeting_date": "2024-01-10",
            "summary": "Covered services.\n- Approved the budget."
        })
        .to_string()
    };

    Json(json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    }))
}

async fn spawn_stub() -> String {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/v1beta/models/:model", post(generate))
        .with_state(calls);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn document(id: &str) -> ExtractedDocument {
    ExtractedDocument::new(
        id.to_string(),
        format!("doc_{}.pdf", id),
        "Minutes of the meeting.".to_string(),
        "Minutes of the meeting.".to_string(),
        HashMap::new(),
    )
}

#[tokio::test]
async fn batch_isolates_per_item_failures_and_preserves_order() {
    let endpoint = spawn_stub().await;
    let enricher = Enricher::new(GeminiClient::new(GeminiConfig {
        api_key: "test-key".to_string(),
        endpoint,
        ..Default::default()
    }));

    let documents = vec![document("1"), document("2"), document("3")];

    // Zero delay: batch environments must not be forced to wait
    let (records, failures) = enricher.enrich_many(&documents, Duration::ZERO).await;

    // The middle document's invalid response skips only that document
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "1");
    assert_eq!(records[1].id, "3");

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].document_id, "2");
    assert_eq!(failures[0].reason, "json_parse_error");
}

#[tokio::test]
async fn accepted_records_carry_compression_stats() {
    let endpoint = spawn_stub().await;
    let enricher = Enricher::new(GeminiClient::new(GeminiConfig {
        api_key: "test-key".to_string(),
        endpoint,
        ..Default::default()
    }));

    let record = enricher
        .enrich("Minutes of the meeting.", "doc_9.pdf", "9")
        .await
        .unwrap();

    assert_eq!(record.id, "9");
    assert_eq!(record.date, "2024-01-10");
    assert_eq!(record.source_char_count, "Minutes of the meeting.".chars().count());
    assert!(record.summary_char_count > 0);
    assert!(record.compression_ratio > 0.0);
}
