//! Reflex rerank command-line entrypoint.
//!
//! ```text
//! reflex-rerank [--health-check] [--context] <query>...
//! ```
//!
//! Each query runs through hybrid retrieval and cross-encoder reranking; responses are printed
//! as pretty JSON in argument order.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;

use reflex_rerank::config::Config;
use reflex_rerank::documents::InMemoryDocumentStore;
use reflex_rerank::embedding::{QueryEncoder, Reranker};
use reflex_rerank::scoring::CrossEncoderScorer;
use reflex_rerank::search::{Bm25Index, HybridSearch};
use reflex_rerank::service::RetrievalService;
use reflex_rerank::vectordb::{QdrantClient, VectorSemanticSearch};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(
    name = "reflex-rerank",
    about = "Hybrid retrieval with cross-encoder reranking; prints one JSON response per query."
)]
struct Cli {
    /// Load the model, print its health status and exit.
    #[arg(long)]
    health_check: bool,

    /// Attach the full documents referenced by each result.
    #[arg(long)]
    context: bool,

    /// Queries to rerank, answered in order. Use `--` before a query that starts with `-`.
    #[arg(required_unless_present = "health_check")]
    queries: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!(
        qdrant_url = %config.qdrant_url,
        collection = %config.collection,
        k_retrieve = config.k_retrieve,
        k_return = config.k_return,
        "Reflex rerank starting"
    );

    let encoder = Arc::new(QueryEncoder::load(config.encoder_config())?);
    let qdrant = QdrantClient::new(&config.qdrant_url)?;
    let semantic = VectorSemanticSearch::new(qdrant, encoder, config.collection.clone());

    let lexical = match &config.corpus_path {
        Some(path) => Bm25Index::load_jsonl(path)?,
        None => {
            tracing::warn!("No RERANK_CORPUS_PATH configured, lexical search starts empty");
            Bm25Index::new()
        }
    };
    let candidates = HybridSearch::new(semantic, lexical).with_mode_policy(config.lexical_mode);

    let documents = match &config.documents_path {
        Some(path) => InMemoryDocumentStore::load_json(path)?,
        None => InMemoryDocumentStore::new(),
    };

    let reranker_config = config.reranker_config();
    let scorer = CrossEncoderScorer::new(
        move || Reranker::load(reranker_config.clone()),
        config.scoring_workers,
    );

    let service = RetrievalService::new(
        candidates,
        documents,
        scorer,
        config.score_cache(),
        config.service_config(),
    );

    if cli.health_check {
        let status = service.health().await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(if status.is_healthy() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let mut failed = false;
    if cli.context {
        for query in &cli.queries {
            match service.rerank_with_context(&config.request(query.as_str()), true).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(e) => {
                    tracing::error!(query = %query, error = %e, "Rerank failed");
                    failed = true;
                }
            }
        }
    } else {
        let requests: Vec<_> = cli
            .queries
            .iter()
            .map(|query| config.request(query.as_str()))
            .collect();
        for (request, result) in requests.iter().zip(service.rerank_batch(&requests).await) {
            match result {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(e) => {
                    tracing::error!(query = %request.query, error = %e, "Rerank failed");
                    failed = true;
                }
            }
        }
    }

    tracing::info!(stats = ?service.stats(), "Reflex rerank finished");

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_and_queries() {
        let cli = Cli::try_parse_from(["reflex-rerank", "--context", "diabetes", "metformin"])
            .unwrap();
        assert!(cli.context);
        assert!(!cli.health_check);
        assert_eq!(cli.queries, vec!["diabetes", "metformin"]);
    }

    #[test]
    fn test_misspelled_flag_is_rejected() {
        assert!(Cli::try_parse_from(["reflex-rerank", "--contxt", "diabetes"]).is_err());
    }

    #[test]
    fn test_dash_prefixed_query_after_separator() {
        let cli = Cli::try_parse_from(["reflex-rerank", "--", "--weird query"]).unwrap();
        assert_eq!(cli.queries, vec!["--weird query"]);
    }

    #[test]
    fn test_queries_required_without_health_check() {
        assert!(Cli::try_parse_from(["reflex-rerank"]).is_err());

        let cli = Cli::try_parse_from(["reflex-rerank", "--health-check"]).unwrap();
        assert!(cli.health_check);
        assert!(cli.queries.is_empty());
    }
}
