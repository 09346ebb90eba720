//! Tests for candidate records, transcripts and summaries.

use hirebot::candidates::{CandidateStore, SqliteCandidateStore, TranscriptEntry};

async fn store() -> SqliteCandidateStore {
    let pool = hirebot::db::open_in_memory()
        .await
        .expect("in-memory db should open");
    SqliteCandidateStore::new(pool)
}

fn entry(role: &str, content: &str) -> TranscriptEntry {
    TranscriptEntry {
        role: role.to_owned(),
        content: content.to_owned(),
    }
}

#[tokio::test]
async fn create_user_is_idempotent_and_normalizes_phone() {
    let store = store().await;
    assert!(!store.user_exists("123-456-7890").await.expect("lookup"));

    assert!(store
        .create_user("(123) 456-7890", Some("John"), Some("Python Developer"))
        .await
        .expect("create"));
    assert!(!store
        .create_user("1234567890", Some("Johnny"), None)
        .await
        .expect("second create"));

    assert!(store.user_exists("+1 123 456 7890").await.expect("lookup"));
    let record = store
        .get_candidate("1234567890")
        .await
        .expect("lookup")
        .expect("record");
    assert_eq!(record.name.as_deref(), Some("John"));
    assert_eq!(record.job_interest.as_deref(), Some("Python Developer"));
}

#[tokio::test]
async fn summary_upserts_and_blank_reads_as_none() {
    let store = store().await;
    assert_eq!(store.conversation_summary("1234567890").await.expect("read"), None);

    // Creates the record when missing.
    store
        .update_summary("1234567890", "Asked about salary.")
        .await
        .expect("update");
    assert_eq!(
        store.conversation_summary("1234567890").await.expect("read").as_deref(),
        Some("Asked about salary.")
    );

    store.update_summary("1234567890", "   ").await.expect("update");
    assert_eq!(store.conversation_summary("1234567890").await.expect("read"), None);
}

#[tokio::test]
async fn transcripts_are_listed_newest_first() {
    let store = store().await;
    store
        .save_transcript("1234567890", &[entry("user", "hello")])
        .await
        .expect("save");
    store
        .save_transcript(
            "1234567890",
            &[entry("user", "book me"), entry("assistant", "done")],
        )
        .await
        .expect("save");

    let history = store
        .conversation_history("123-456-7890", 10)
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].message_count, 2);
    assert_eq!(history[0].transcript[1], entry("assistant", "done"));
    assert_eq!(history[1].transcript, vec![entry("user", "hello")]);

    let latest = store
        .conversation_history("1234567890", 1)
        .await
        .expect("history");
    assert_eq!(latest.len(), 1);

    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.transcripts, 2);
}

#[tokio::test]
async fn job_interest_updates_existing_records_only() {
    let store = store().await;
    assert!(!store
        .update_job_interest("1234567890", "Data Analyst")
        .await
        .expect("update"));

    store
        .create_user("1234567890", None, None)
        .await
        .expect("create");
    assert!(store
        .update_job_interest("1234567890", "Data Analyst")
        .await
        .expect("update"));
    let record = store
        .get_candidate("1234567890")
        .await
        .expect("lookup")
        .expect("record");
    assert_eq!(record.job_interest.as_deref(), Some("Data Analyst"));
    assert_eq!(store.stats().await.expect("stats").candidates, 1);
}
