//! End-to-end retrieval over in-memory backends and the stub models.

mod common;

use std::time::Duration;

use common::fixtures::{
    PassageBuilder, build_pipeline, clinical_corpus, corpus_jsonl_file, documents_json_file,
    patient_documents,
};
use reflex_rerank::cache::CacheStatus;
use reflex_rerank::documents::{DocumentStore, InMemoryDocumentStore};
use reflex_rerank::passage::MetadataFilter;
use reflex_rerank::search::{Bm25Index, LexicalMode, LexicalSearch};
use reflex_rerank::service::{Augmentation, RerankRequest, RetrievalError, ServiceConfig};

fn request(query: &str) -> RerankRequest {
    RerankRequest::new(query).with_k_retrieve(6).with_k_return(3)
}

#[tokio::test]
async fn test_pipeline_ranks_relevant_passage_first() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;

    let response = pipeline.rerank(&request("metformin dose diabetes")).await.unwrap();

    assert_eq!(response.cache_status, CacheStatus::Miss);
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.results[0].id(), "med-metformin");
    assert_eq!(response.results[1].id(), "cond-dm");
    assert!(
        response
            .results
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score)
    );
}

#[tokio::test]
async fn test_repeated_query_is_served_from_cache() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    let req = request("metformin dose diabetes");

    let first = pipeline.rerank(&req).await.unwrap();
    let second = pipeline.rerank(&req).await.unwrap();

    assert_eq!(first.cache_status, CacheStatus::Miss);
    assert_eq!(second.cache_status, CacheStatus::Hit);
    assert_eq!(first.results, second.results);

    let stats = pipeline.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.cache_size, 1);
}

#[tokio::test]
async fn test_changed_candidate_set_misses_cache() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    pipeline
        .candidates()
        .semantic()
        .client()
        .set_unavailable(true);
    let req = request("metformin");

    let first = pipeline.rerank(&req).await.unwrap();
    assert_eq!(first.results.len(), 1);
    assert_eq!(pipeline.rerank(&req).await.unwrap().cache_status, CacheStatus::Hit);

    pipeline.candidates().lexical().upsert(
        PassageBuilder::new()
            .id("med-metformin-er")
            .content("Metformin extended release 750 mg nightly")
            .patient("pat-1")
            .build(),
    );

    let after = pipeline.rerank(&req).await.unwrap();
    assert_eq!(after.cache_status, CacheStatus::Miss);
    assert_eq!(after.results.len(), 2);
}

#[tokio::test]
async fn test_vector_store_outage_degrades_to_lexical() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    pipeline
        .candidates()
        .semantic()
        .client()
        .set_unavailable(true);

    let response = pipeline.rerank(&request("lisinopril")).await.unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].id(), "med-lisinopril");
}

#[tokio::test]
async fn test_code_query_uses_phrase_matching() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    pipeline
        .candidates()
        .semantic()
        .client()
        .set_unavailable(true);

    let response = pipeline.rerank(&request("E11.9")).await.unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].id(), "cond-dm");
}

#[tokio::test]
async fn test_no_candidates_skips_scoring() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    pipeline
        .candidates()
        .semantic()
        .client()
        .set_unavailable(true);

    let response = pipeline.rerank(&request("zebrafish")).await.unwrap();

    assert!(response.results.is_empty());
    assert_eq!(response.cache_status, CacheStatus::Skipped);
    assert!(!pipeline.scorer().is_initialized());
}

#[tokio::test]
async fn test_filter_limits_results_to_one_patient() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    let req = request("blood pressure medication")
        .with_filter(MetadataFilter::equals("patient_id", "pat-2"));

    let response = pipeline.rerank(&req).await.unwrap();

    assert!(!response.results.is_empty());
    assert!(
        response
            .results
            .iter()
            .all(|r| r.passage.entity_id("patient_id").as_deref() == Some("pat-2"))
    );
}

#[tokio::test]
async fn test_context_fetches_referenced_patient_documents() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    let req = request("metformin dose diabetes").with_k_return(2);

    let context = pipeline.rerank_with_context(&req, true).await.unwrap();

    let documents = context.full_documents.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].entity_id, "pat-1");

    let without = pipeline.rerank_with_context(&req, false).await.unwrap();
    assert_eq!(without.full_documents, Augmentation::NotRequested);
    assert_eq!(without.response.cache_status, CacheStatus::Hit);
}

#[tokio::test]
async fn test_context_survives_document_store_outage() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    pipeline.documents().set_unavailable(true);

    let context = pipeline
        .rerank_with_context(&request("metformin dose diabetes"), true)
        .await
        .unwrap();

    assert_eq!(context.response.results.len(), 3);
    assert!(matches!(context.full_documents, Augmentation::Failed { .. }));
}

#[tokio::test]
async fn test_batch_keeps_request_order() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;
    let requests = [
        request("metformin dose diabetes"),
        request("   "),
        request("seasonal allergies"),
    ];

    let results = pipeline.rerank_batch(&requests).await;

    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().unwrap().results[0].id(),
        "med-metformin"
    );
    assert!(matches!(
        results[1],
        Err(RetrievalError::InvalidRequest { .. })
    ));
    assert_eq!(
        results[2].as_ref().unwrap().results[0].id(),
        "allergy-pollen"
    );
}

#[tokio::test]
async fn test_stats_and_health_report_stub_model() {
    let pipeline = build_pipeline(ServiceConfig {
        timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .await;

    let before = pipeline.stats();
    assert!(!before.model_loaded);
    assert_eq!(before.device, "unloaded");

    let health = pipeline.health().await;
    assert!(health.is_healthy());

    let after = pipeline.stats();
    assert!(after.model_loaded);
    assert_eq!(after.model_name, "stub-lexical-overlap");
    assert_eq!(after.device, "cpu");
}

#[tokio::test]
async fn test_response_json_shape() {
    let pipeline = build_pipeline(ServiceConfig::default()).await;

    let context = pipeline
        .rerank_with_context(&request("metformin dose diabetes").with_k_return(1), true)
        .await
        .unwrap();
    let value = serde_json::to_value(&context).unwrap();

    assert_eq!(value["query"], "metformin dose diabetes");
    assert_eq!(value["cache_status"], "miss");
    assert_eq!(value["results"][0]["id"], "med-metformin");
    assert_eq!(value["results"][0]["metadata"]["patient_id"], "pat-1");
    assert!(value["results"][0]["score"].is_number());
    assert_eq!(value["full_documents"]["status"], "fetched");
    assert_eq!(value["full_documents"]["documents"][0]["entity_id"], "pat-1");
}

#[tokio::test]
async fn test_backends_load_from_files() {
    let corpus = corpus_jsonl_file(&clinical_corpus());
    let documents = documents_json_file(&patient_documents());

    let index = Bm25Index::load_jsonl(corpus.path()).unwrap();
    assert_eq!(index.len(), 6);
    let hits = index
        .search("hypertension", 5, &MetadataFilter::new(), LexicalMode::Natural)
        .await
        .unwrap();
    assert_eq!(hits[0].id, "cond-htn");

    let store = InMemoryDocumentStore::load_json(documents.path()).unwrap();
    assert_eq!(store.entity_count(), 3);
    let fetched = store
        .fetch_full_documents(&["pat-3".to_string(), "pat-9".to_string()])
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].entity_id, "pat-3");
}
