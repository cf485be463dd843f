use super::*;
use crate::passage::{Metadata, MetadataFilter, Passage};

fn passage(id: &str, content: &str) -> Passage {
    Passage::new(id, content, Metadata::new())
}

fn patient_passage(id: &str, content: &str, patient: &str) -> Passage {
    Passage::new(id, content, Metadata::new().with("patient_id", patient))
}

fn ids(passages: &[Passage]) -> Vec<&str> {
    passages.iter().map(|p| p.id.as_str()).collect()
}

#[test]
fn test_merge_interleaves_by_rank() {
    let merged = merge_candidates(
        vec![passage("s1", ""), passage("s2", ""), passage("s3", "")],
        vec![passage("l1", ""), passage("l2", "")],
        10,
    );
    assert_eq!(ids(&merged), vec!["s1", "l1", "s2", "l2", "s3"]);
}

#[test]
fn test_merge_keeps_one_copy_per_id() {
    let merged = merge_candidates(
        vec![passage("a", "semantic copy"), passage("b", "")],
        vec![passage("b", ""), passage("a", "lexical copy"), passage("c", "")],
        10,
    );

    assert_eq!(ids(&merged), vec!["a", "b", "c"]);
    assert_eq!(merged[0].content, "semantic copy");
}

#[test]
fn test_merge_truncates_to_k() {
    let merged = merge_candidates(
        (0..10).map(|i| passage(&format!("s{i}"), "")).collect(),
        (0..10).map(|i| passage(&format!("l{i}"), "")).collect(),
        4,
    );
    assert_eq!(ids(&merged), vec!["s0", "l0", "s1", "l1"]);
}

#[test]
fn test_code_like_classification() {
    assert!(is_code_like("E11.9"));
    assert!(is_code_like("patients coded E11.9"));
    assert!(is_code_like("LOINC 2339-0"));
    assert!(is_code_like("latest A1c"));
    assert!(!is_code_like("type two diabetes"));
    assert!(!is_code_like("glucose over 200"));
    assert!(!is_code_like(""));
}

#[test]
fn test_mode_policy() {
    assert_eq!(LexicalModePolicy::Auto.resolve("E11.9"), LexicalMode::Phrase);
    assert_eq!(LexicalModePolicy::Auto.resolve("diabetes"), LexicalMode::Natural);
    assert_eq!(
        LexicalModePolicy::Fixed(LexicalMode::Natural).resolve("E11.9"),
        LexicalMode::Natural
    );
    assert_eq!(
        "phrase".parse::<LexicalModePolicy>().unwrap(),
        LexicalModePolicy::Fixed(LexicalMode::Phrase)
    );
    assert_eq!(" AUTO ".parse::<LexicalModePolicy>().unwrap(), LexicalModePolicy::Auto);
    assert!("fuzzy".parse::<LexicalModePolicy>().is_err());
}

#[test]
fn test_phrase_terms() {
    assert_eq!(phrase_terms(r#"history of "heart failure" notes"#), vec!["heart failure"]);
    assert_eq!(phrase_terms("coded E11.9 or I10"), vec!["e11.9", "i10"]);
    assert_eq!(phrase_terms("  Chest Pain "), vec!["chest pain"]);
    assert!(phrase_terms("   ").is_empty());
}

fn clinical_index() -> Bm25Index {
    Bm25Index::from_passages([
        patient_passage("c1", "Type 2 diabetes mellitus without complications, E11.9", "pat-1"),
        patient_passage("c2", "Essential hypertension I10, blood pressure controlled", "pat-1"),
        patient_passage("c3", "Diabetes education provided; diet and exercise reviewed", "pat-2"),
        patient_passage("c4", "Seasonal allergies, loratadine as needed", "pat-2"),
    ])
}

#[test]
fn test_bm25_natural_ranks_matching_terms() {
    let index = clinical_index();
    let results = index.query("diabetes", 10, &MetadataFilter::new(), LexicalMode::Natural);

    let found = ids(&results);
    assert!(found.contains(&"c1"));
    assert!(found.contains(&"c3"));
    assert!(!found.contains(&"c4"));
}

#[test]
fn test_bm25_filter_applies() {
    let index = clinical_index();
    let filter = MetadataFilter::equals("patient_id", "pat-2");
    let results = index.query("diabetes", 10, &filter, LexicalMode::Natural);

    assert_eq!(ids(&results), vec!["c3"]);
}

#[test]
fn test_bm25_phrase_requires_exact_code() {
    let index = clinical_index();
    let results = index.query("E11.9", 10, &MetadataFilter::new(), LexicalMode::Phrase);

    assert_eq!(ids(&results), vec!["c1"]);
}

#[test]
fn test_bm25_upsert_replaces_by_id() {
    let index = clinical_index();
    index.upsert(patient_passage("c4", "Asthma, albuterol inhaler", "pat-2"));

    assert_eq!(index.len(), 4);
    let results = index.query("albuterol", 10, &MetadataFilter::new(), LexicalMode::Natural);
    assert_eq!(ids(&results), vec!["c4"]);
    assert!(
        index
            .query("loratadine", 10, &MetadataFilter::new(), LexicalMode::Phrase)
            .is_empty()
    );
}

#[test]
fn test_bm25_window_respects_k_and_filters() {
    let mut passages: Vec<Passage> = (0..30)
        .map(|i| patient_passage(&format!("d{i}"), "diabetes diabetes follow-up", "pat-1"))
        .collect();
    passages.push(patient_passage(
        "late",
        "diabetes noted once among several unrelated observations about sleep and diet",
        "pat-9",
    ));
    let index = Bm25Index::from_passages(passages);

    let top = index.query("diabetes", 3, &MetadataFilter::new(), LexicalMode::Natural);
    assert_eq!(top.len(), 3);
    assert!(!ids(&top).contains(&"late"));

    let filter = MetadataFilter::equals("patient_id", "pat-9");
    let filtered = index.query("diabetes", 1, &filter, LexicalMode::Natural);
    assert_eq!(ids(&filtered), vec!["late"]);
}

#[test]
fn test_bm25_zero_k_and_empty_index() {
    let index = clinical_index();
    assert!(index.query("diabetes", 0, &MetadataFilter::new(), LexicalMode::Natural).is_empty());
    assert!(
        Bm25Index::new()
            .query("diabetes", 5, &MetadataFilter::new(), LexicalMode::Natural)
            .is_empty()
    );
}

#[test]
fn test_bm25_load_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corpus.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"id":"p1","content":"Metformin 500 mg","metadata":{"patient_id":"pat-1"}}"#,
            "\n\n",
            r#"{"content":"Lisinopril 10 mg","metadata":{"chunk_id":"chunk-7"}}"#,
            "\n",
            r#"{"content":"Atorvastatin 20 mg"}"#,
            "\n",
        ),
    )
    .unwrap();

    let index = Bm25Index::load_jsonl(&path).unwrap();
    assert_eq!(index.len(), 3);

    let hits = index.query("lisinopril", 5, &MetadataFilter::new(), LexicalMode::Natural);
    assert_eq!(ids(&hits), vec!["chunk-7"]);

    let hits = index.query("atorvastatin", 5, &MetadataFilter::new(), LexicalMode::Natural);
    assert!(hits[0].id.starts_with("content:3:"));
}

#[test]
fn test_bm25_load_rejects_bad_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corpus.jsonl");
    std::fs::write(&path, "{\"content\":\"ok\"}\nnot json\n").unwrap();

    let err = Bm25Index::load_jsonl(&path).unwrap_err();
    assert!(matches!(err, SearchError::CorpusLoad { .. }));
    assert!(err.to_string().contains("line 2"));
}

#[tokio::test]
async fn test_hybrid_unions_both_sources() {
    let hybrid = HybridSearch::new(
        MockSemanticSearch::new(vec![passage("a", ""), passage("b", "")]),
        MockLexicalSearch::new(vec![passage("b", ""), passage("c", "")]),
    );

    let candidates = hybrid.candidates("q", 10, &MetadataFilter::new()).await;

    assert_eq!(ids(&candidates.passages), vec!["a", "b", "c"]);
    assert_eq!(candidates.semantic_hits, Some(2));
    assert_eq!(candidates.lexical_hits, Some(2));
    assert!(!candidates.is_degraded());
}

#[tokio::test]
async fn test_hybrid_degrades_when_semantic_fails() {
    let hybrid = HybridSearch::new(
        MockSemanticSearch::failing(),
        MockLexicalSearch::new(vec![passage("l1", ""), passage("l2", "")]),
    );

    let candidates = hybrid.candidates("q", 10, &MetadataFilter::new()).await;

    assert_eq!(ids(&candidates.passages), vec!["l1", "l2"]);
    assert_eq!(candidates.semantic_hits, None);
    assert!(candidates.is_degraded());
}

#[tokio::test]
async fn test_hybrid_degrades_when_lexical_fails() {
    let hybrid = HybridSearch::new(
        MockSemanticSearch::new(vec![passage("s1", "")]),
        MockLexicalSearch::failing(),
    );

    let candidates = hybrid.candidates("q", 10, &MetadataFilter::new()).await;

    assert_eq!(ids(&candidates.passages), vec!["s1"]);
    assert_eq!(candidates.lexical_hits, None);
}

#[tokio::test]
async fn test_hybrid_both_fail_is_empty() {
    let hybrid = HybridSearch::new(MockSemanticSearch::failing(), MockLexicalSearch::failing());

    let candidates = hybrid.candidates("q", 10, &MetadataFilter::new()).await;

    assert!(candidates.is_empty());
    assert_eq!(candidates.semantic_hits, None);
    assert_eq!(candidates.lexical_hits, None);
}

#[tokio::test]
async fn test_hybrid_passes_filter_and_mode() {
    let hybrid = HybridSearch::new(
        MockSemanticSearch::new(vec![
            patient_passage("s1", "", "pat-1"),
            patient_passage("s2", "", "pat-2"),
        ]),
        MockLexicalSearch::new(vec![patient_passage("l1", "", "pat-2")]),
    );

    let filter = MetadataFilter::equals("patient_id", "pat-2");
    let candidates = hybrid.candidates("E11.9", 10, &filter).await;

    assert_eq!(ids(&candidates.passages), vec!["s2", "l1"]);
    assert_eq!(hybrid.lexical().last_mode(), Some(LexicalMode::Phrase));

    let fixed = HybridSearch::new(MockSemanticSearch::default(), MockLexicalSearch::default())
        .with_mode_policy(LexicalModePolicy::Fixed(LexicalMode::Natural));
    fixed.candidates("E11.9", 10, &MetadataFilter::new()).await;
    assert_eq!(fixed.lexical().last_mode(), Some(LexicalMode::Natural));
}

#[tokio::test]
async fn test_hybrid_with_bm25_index() {
    let hybrid = HybridSearch::new(
        MockSemanticSearch::new(vec![passage("c2", "Essential hypertension I10")]),
        clinical_index(),
    );

    let candidates = hybrid.candidates("E11.9", 5, &MetadataFilter::new()).await;

    assert_eq!(ids(&candidates.passages), vec!["c2", "c1"]);
}

#[tokio::test]
async fn test_hybrid_zero_k() {
    let hybrid = HybridSearch::new(
        MockSemanticSearch::new(vec![passage("a", "")]),
        MockLexicalSearch::new(vec![passage("b", "")]),
    );
    let candidates = hybrid.candidates("q", 0, &MetadataFilter::new()).await;
    assert!(candidates.is_empty());
    assert_eq!(hybrid.semantic().calls(), 0);
}
