//! On-disk store behavior
//!
//! The in-module store tests run in memory; these verify that a store
//! opened at a real path persists the collections across handles, the
//! way a long-lived service process consumes them.

use shortlist_core::{ChunkRecord, DocumentStore, ExperienceEntry, SqliteStore};
use tempfile::TempDir;

#[tokio::test]
async fn test_store_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("resumes.sqlite");

    {
        let store = SqliteStore::open(&db_path).unwrap();
        store.insert_skill("c1", "python", 0.9).unwrap();
        store.insert_skill("c1", "django", 0.8).unwrap();
        store
            .insert_chunk(&ChunkRecord {
                chunk_id: "c1-exp-0".into(),
                candidate_id: "c1".into(),
                section_type: "experience".into(),
                section_ordinal: 0,
                chunk_text: "Python developer building Django services".into(),
                embedding: Some(vec![1.0, 0.0]),
            })
            .unwrap();
        store
            .insert_profile(
                "c1",
                "Alex Doe",
                "Backend developer",
                5,
                "DE",
                "Berlin",
                &[ExperienceEntry {
                    title: "Backend Developer".into(),
                    company: "Initech".into(),
                }],
            )
            .unwrap();
    }

    // A fresh handle over the same file sees everything
    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.chunk_count().unwrap(), 1);

    let skills = vec!["python".to_string(), "django".to_string()];
    let matches = store.search_skills(&skills, 2, 10).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].candidate_id, "c1");
    assert_eq!(matches[0].matched_count, 2);

    let chunks = store
        .fetch_chunks(Some(&["c1".to_string()]), true)
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].embedding, Some(vec![1.0, 0.0]));

    let profiles = store.fetch_profiles(&["c1".to_string()]).await.unwrap();
    assert_eq!(profiles[0].headline, "Backend Developer at Initech");
}

#[tokio::test]
async fn test_upserts_replace_existing_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("resumes.sqlite");
    let store = SqliteStore::open(&db_path).unwrap();

    store.insert_skill("c1", "python", 0.5).unwrap();
    store.insert_skill("c1", "python", 0.9).unwrap();

    let matches = store
        .search_skills(&["python".to_string()], 1, 10)
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].matched_count, 1);
    assert!((matches[0].avg_confidence - 0.9).abs() < 1e-9);

    store
        .insert_chunk(&ChunkRecord {
            chunk_id: "c1-exp-0".into(),
            candidate_id: "c1".into(),
            section_type: "experience".into(),
            section_ordinal: 0,
            chunk_text: "first draft".into(),
            embedding: None,
        })
        .unwrap();
    store
        .insert_chunk(&ChunkRecord {
            chunk_id: "c1-exp-0".into(),
            candidate_id: "c1".into(),
            section_type: "experience".into(),
            section_ordinal: 0,
            chunk_text: "reingested text".into(),
            embedding: None,
        })
        .unwrap();

    assert_eq!(store.chunk_count().unwrap(), 1);
    let chunks = store.fetch_chunks(None, false).await.unwrap();
    assert_eq!(chunks[0].chunk_text, "reingested text");
}
