use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::embedding::{Reranker, RerankerError};
use crate::passage::{Metadata, Passage};

fn passage(id: &str, content: &str) -> Passage {
    Passage::new(id, content, Metadata::new())
}

#[tokio::test]
async fn test_score_all_orders_best_first() {
    let model = MockScoringModel::new()
        .with_score("low", 0.1)
        .with_score("high", 0.9)
        .with_score("mid", 0.5);
    let scorer = CrossEncoderScorer::with_model(model, 2);

    let ranked = scorer
        .score_all(
            "q",
            vec![passage("a", "low"), passage("b", "high"), passage("c", "mid")],
        )
        .await
        .unwrap();

    let ids: Vec<&str> = ranked.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
    assert_eq!(ranked[0].score, 0.9);
}

#[tokio::test]
async fn test_ties_keep_input_order() {
    let model = MockScoringModel::new()
        .with_score("first", 0.9)
        .with_score("second", 0.9)
        .with_score("other", 0.2);
    let scorer = CrossEncoderScorer::with_model(model, 1);

    let ranked = scorer
        .rerank(
            "q",
            vec![
                passage("A", "first"),
                passage("C", "other"),
                passage("B", "second"),
            ],
            5,
        )
        .await
        .unwrap();

    let ids: Vec<&str> = ranked.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_rerank_truncates() {
    let scorer = CrossEncoderScorer::with_model(MockScoringModel::new(), 1);
    let passages = (0..8).map(|i| passage(&format!("p{i}"), "x")).collect();

    let ranked = scorer.rerank("q", passages, 3).await.unwrap();
    assert_eq!(ranked.len(), 3);
}

#[tokio::test]
async fn test_empty_input_skips_model() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let scorer = CrossEncoderScorer::new(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(MockScoringModel::new())
        },
        1,
    );

    assert!(scorer.score_all("q", Vec::new()).await.unwrap().is_empty());
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert!(!scorer.is_initialized());
    assert!(scorer.identity().is_none());
}

#[tokio::test]
async fn test_model_loads_once_under_concurrency() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let scorer = Arc::new(CrossEncoderScorer::new(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(MockScoringModel::new())
        },
        2,
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let scorer = Arc::clone(&scorer);
            tokio::spawn(async move {
                scorer
                    .score_all("q", vec![passage(&format!("p{i}"), "text")])
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 1);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(
        scorer.identity().unwrap().name,
        MockScoringModel::NAME.to_string()
    );
}

#[tokio::test]
async fn test_failed_load_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let scorer = CrossEncoderScorer::new(
        move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RerankerError::ModelLoadFailed {
                    reason: "first attempt".to_string(),
                })
            } else {
                Ok(MockScoringModel::new())
            }
        },
        1,
    );

    assert!(matches!(
        scorer.model().await,
        Err(RerankerError::ModelLoadFailed { .. })
    ));
    assert!(scorer.model().await.is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_inference_error_propagates() {
    let scorer = CrossEncoderScorer::with_model(MockScoringModel::failing(), 1);
    let result = scorer.score_all("q", vec![passage("a", "x")]).await;
    assert!(matches!(result, Err(RerankerError::InferenceFailed { .. })));
}

#[tokio::test]
async fn test_batch_preserves_order_and_isolates_items() {
    let model = MockScoringModel::new()
        .with_score("alpha", 0.8)
        .with_score("beta", 0.3);
    let scorer = CrossEncoderScorer::with_model(model, 2);

    let results = scorer
        .rerank_batch(
            vec![
                ("one".to_string(), vec![passage("b", "beta"), passage("a", "alpha")]),
                ("two".to_string(), Vec::new()),
                ("three".to_string(), vec![passage("c", "beta")]),
            ],
            10,
        )
        .await;

    assert_eq!(results.len(), 3);
    let first = results[0].as_ref().unwrap();
    assert_eq!(first[0].id(), "a");
    assert!(results[1].as_ref().unwrap().is_empty());
    assert_eq!(results[2].as_ref().unwrap()[0].id(), "c");
}

#[tokio::test]
async fn test_stub_reranker_through_scorer() {
    let scorer = CrossEncoderScorer::new(Reranker::stub, 1);

    let ranked = scorer
        .score_all(
            "metformin dose",
            vec![
                passage("noise", "Patient enjoys hiking"),
                passage("hit", "Metformin dose 500 mg"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(ranked[0].id(), "hit");
    assert_eq!(scorer.identity().unwrap().device, "cpu");
}

#[tokio::test]
async fn test_abandoned_first_load_is_not_repeated() {
    let runs = Arc::new(AtomicUsize::new(0));
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (runs_seen, active_seen, peak_seen) =
        (Arc::clone(&runs), Arc::clone(&active), Arc::clone(&peak));
    let scorer = CrossEncoderScorer::new(
        move || {
            runs_seen.fetch_add(1, Ordering::SeqCst);
            let now = active_seen.fetch_add(1, Ordering::SeqCst) + 1;
            peak_seen.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            active_seen.fetch_sub(1, Ordering::SeqCst);
            Ok(MockScoringModel::new())
        },
        1,
    );

    let abandoned = tokio::time::timeout(Duration::from_millis(50), scorer.model()).await;
    assert!(abandoned.is_err());

    scorer.model().await.unwrap();
    assert!(scorer.is_initialized());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}
