//! Qdrant vector database integration: the semantic retrieval source.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod semantic;


pub use client::{QdrantClient, VectorDbClient};
pub use error::VectorDbError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockVectorDbClient, cosine_similarity};
pub use model::{
    SearchResult, VectorPoint, filter_conditions, metadata_from_value, metadata_to_value,
    passage_payload, point_id_for,
};
pub use semantic::VectorSemanticSearch;
