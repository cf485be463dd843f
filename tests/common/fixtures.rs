//! Test fixtures for integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use serde_json::json;
use tempfile::NamedTempFile;

use reflex_rerank::cache::ScoreCache;
use reflex_rerank::documents::{FullDocument, InMemoryDocumentStore};
use reflex_rerank::embedding::{QueryEmbedder, QueryEncoder, Reranker};
use reflex_rerank::passage::{Metadata, Passage};
use reflex_rerank::scoring::CrossEncoderScorer;
use reflex_rerank::search::{Bm25Index, HybridSearch};
use reflex_rerank::service::{RetrievalService, ServiceConfig};
use reflex_rerank::vectordb::{
    MockVectorDbClient, VectorDbClient, VectorPoint, VectorSemanticSearch,
};

pub const COLLECTION: &str = "clinical_passages";

pub type Pipeline = RetrievalService<
    HybridSearch<VectorSemanticSearch<MockVectorDbClient, QueryEncoder>, Bm25Index>,
    InMemoryDocumentStore,
    Reranker,
>;

#[derive(Default)]
pub struct PassageBuilder {
    id: Option<String>,
    content: Option<String>,
    metadata: Metadata,
}

impl PassageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn patient(mut self, patient_id: &str) -> Self {
        self.metadata = self.metadata.with("patient_id", patient_id);
        self
    }

    pub fn resource_type(mut self, resource_type: &str) -> Self {
        self.metadata = self.metadata.with("resource_type", resource_type);
        self
    }

    pub fn build(self) -> Passage {
        Passage::new(
            self.id.unwrap_or_else(|| "passage-0".to_string()),
            self.content.unwrap_or_default(),
            self.metadata,
        )
    }
}

/// Six chart snippets across three patients.
pub fn clinical_corpus() -> Vec<Passage> {
    vec![
        PassageBuilder::new()
            .id("obs-a1c")
            .content("Hemoglobin A1c 7.2 percent on 2023-04-02")
            .patient("pat-1")
            .resource_type("Observation")
            .build(),
        PassageBuilder::new()
            .id("cond-dm")
            .content("Diagnosis: type 2 diabetes mellitus without complications (E11.9)")
            .patient("pat-1")
            .resource_type("Condition")
            .build(),
        PassageBuilder::new()
            .id("med-metformin")
            .content("Metformin 500 mg tablet twice daily for diabetes")
            .patient("pat-1")
            .resource_type("MedicationRequest")
            .build(),
        PassageBuilder::new()
            .id("cond-htn")
            .content("Essential hypertension (I10)")
            .patient("pat-2")
            .resource_type("Condition")
            .build(),
        PassageBuilder::new()
            .id("med-lisinopril")
            .content("Lisinopril 10 mg daily for blood pressure")
            .patient("pat-2")
            .resource_type("MedicationRequest")
            .build(),
        PassageBuilder::new()
            .id("allergy-pollen")
            .content("Seasonal allergies treated with loratadine")
            .patient("pat-3")
            .resource_type("AllergyIntolerance")
            .build(),
    ]
}

pub fn patient_documents() -> Vec<FullDocument> {
    vec![
        FullDocument::new("pat-1", json!({"name": "Ada", "conditions": ["E11.9"]}))
            .with_source_name("chart"),
        FullDocument::new("pat-2", json!({"name": "Grace", "conditions": ["I10"]}))
            .with_source_name("chart"),
        FullDocument::new("pat-3", json!({"name": "Alan", "allergies": ["pollen"]})),
    ]
}

/// Vector store seeded with the stub encoder's embeddings of `passages`.
pub async fn seeded_vector_store(
    encoder: &QueryEncoder,
    passages: &[Passage],
) -> MockVectorDbClient {
    let client = MockVectorDbClient::new();
    let points = passages
        .iter()
        .map(|p| VectorPoint::new(encoder.embed_query(&p.content).unwrap(), p.clone()))
        .collect();
    client.upsert_points(COLLECTION, points).await.unwrap();
    client
}

/// Full pipeline over [`clinical_corpus`] with stub models and in-memory backends.
pub async fn build_pipeline(config: ServiceConfig) -> Pipeline {
    let corpus = clinical_corpus();
    let encoder = Arc::new(QueryEncoder::stub().unwrap());
    let client = seeded_vector_store(&encoder, &corpus).await;

    let semantic = VectorSemanticSearch::new(client, encoder, COLLECTION);
    let lexical = Bm25Index::from_passages(corpus);

    RetrievalService::new(
        HybridSearch::new(semantic, lexical),
        InMemoryDocumentStore::from_documents(patient_documents()),
        CrossEncoderScorer::new(Reranker::stub, 2),
        ScoreCache::default(),
        config,
    )
}

pub fn corpus_jsonl_file(passages: &[Passage]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for passage in passages {
        writeln!(file, "{}", serde_json::to_string(passage).unwrap()).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn documents_json_file(documents: &[FullDocument]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", serde_json::to_string(documents).unwrap()).unwrap();
    file.flush().unwrap();
    file
}
