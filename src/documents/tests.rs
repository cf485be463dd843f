use serde_json::json;

use super::*;

fn store() -> InMemoryDocumentStore {
    InMemoryDocumentStore::from_documents([
        FullDocument::new("pat-1", json!({"name": "A", "conditions": ["E11.9"]})),
        FullDocument::new("pat-1", json!({"encounters": 3})).with_source_name("ehr"),
        FullDocument::new("pat-2", json!({"name": "B"})),
    ])
}

#[tokio::test]
async fn test_fetch_in_request_order() {
    let docs = store()
        .fetch_full_documents(&["pat-2".to_string(), "pat-1".to_string()])
        .await
        .unwrap();

    let ids: Vec<&str> = docs.iter().map(|d| d.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["pat-2", "pat-1", "pat-1"]);
    assert_eq!(docs[2].source_name.as_deref(), Some("ehr"));
}

#[tokio::test]
async fn test_unknown_ids_are_skipped() {
    let docs = store()
        .fetch_full_documents(&["pat-404".to_string()])
        .await
        .unwrap();
    assert!(docs.is_empty());

    assert!(store().fetch_full_documents(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_store_errors() {
    let store = store();
    store.set_unavailable(true);

    let err = store
        .fetch_full_documents(&["pat-1".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::Unavailable { .. }));
}

#[test]
fn test_load_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.json");
    std::fs::write(
        &path,
        r#"[{"entity_id":"pat-1","body":{"k":1}},{"entity_id":"pat-2","source_name":"fhir","body":null}]"#,
    )
    .unwrap();

    let store = InMemoryDocumentStore::load_json(&path).unwrap();
    assert_eq!(store.entity_count(), 2);

    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        InMemoryDocumentStore::load_json(&path),
        Err(DocumentStoreError::LoadFailed { .. })
    ));
}
