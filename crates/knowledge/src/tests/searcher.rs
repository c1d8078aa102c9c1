//! Blocking search behavior against scripted adapters.

use super::mocks::{passages, Followup, Harness, MockIndex, MockLlm, SynthReply};
use crate::embeddings::providers::trigram::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::index::SqliteIndex;
use crate::rag::{Exhaustive, Searcher, StopReason};
use crate::types::RetrievalResult;
use crate::vector_index::{IndexedChunk, VectorIndex};
use deepsearch_core::{AppError, SearchConfig, StoppingKind};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_zero_max_iter_rejected_before_any_call() {
    let h = Harness::new(MockLlm::new(), MockIndex::with_results(passages()), StoppingKind::Llm);

    let err = h.searcher.query("What is Milvus?", 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = h.searcher.retrieve("What is Milvus?", 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    assert_eq!(h.llm.total_calls(), 0);
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.searches(), 0);
}

#[tokio::test]
async fn test_never_more_than_max_iter_rounds() {
    for max_iter in 1..=4 {
        let h = Harness::new(
            MockLlm::new(),
            MockIndex::with_results(passages()),
            StoppingKind::Exhaustive,
        );

        let outcome = h.searcher.retrieve("What is Milvus?", max_iter).await.unwrap();

        assert_eq!(outcome.metadata.iterations, max_iter);
        assert_eq!(outcome.metadata.stop_reason, StopReason::MaxIterations);
        assert_eq!(h.llm.plan_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.llm.followup_calls.load(Ordering::SeqCst), max_iter - 1);
        // Two sub-queries in round 0, one fresh follow-up per later round
        assert_eq!(h.searches(), 2 + (max_iter - 1));
        assert_eq!(outcome.metadata.sub_queries.len(), 2 + (max_iter - 1));
    }
}

#[tokio::test]
async fn test_judge_that_never_agrees_is_bounded() {
    let h = Harness::new(
        MockLlm::new().with_reflect("NO"),
        MockIndex::with_results(passages()),
        StoppingKind::Llm,
    );

    let outcome = h.searcher.retrieve("What is Milvus?", 3).await.unwrap();

    assert_eq!(outcome.metadata.iterations, 3);
    assert_eq!(outcome.metadata.stop_reason, StopReason::MaxIterations);
    // No sufficiency check after the last round
    assert_eq!(h.llm.reflect_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_judge_stops_early() {
    let h = Harness::new(
        MockLlm::new().with_reflect("YES"),
        MockIndex::with_results(passages()),
        StoppingKind::Llm,
    );

    let outcome = h.searcher.retrieve("What is Milvus?", 5).await.unwrap();

    assert_eq!(outcome.metadata.iterations, 1);
    assert_eq!(outcome.metadata.stop_reason, StopReason::Sufficient);
    assert_eq!(h.llm.followup_calls.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.tokens_consumed, 10 + 3);
}

#[tokio::test]
async fn test_threshold_policy_stops_on_evidence_count() {
    let h = Harness::new(
        MockLlm::new(),
        MockIndex::with_results(passages()),
        StoppingKind::Threshold,
    );
    let searcher = Searcher::new(
        h.embedder.clone(),
        h.index.clone(),
        h.llm.clone(),
        SearchConfig {
            stopping: StoppingKind::Threshold,
            min_results: 2,
            ..SearchConfig::default()
        },
    );

    let outcome = searcher.retrieve("What is Milvus?", 4).await.unwrap();

    assert_eq!(outcome.metadata.stop_reason, StopReason::Sufficient);
    assert_eq!(outcome.metadata.iterations, 1);
    assert_eq!(h.llm.reflect_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tokens_are_sum_of_language_model_calls() {
    let h = Harness::new(
        MockLlm::new().with_reflect("NO"),
        MockIndex::with_results(passages()),
        StoppingKind::Llm,
    );

    let result = h.searcher.query("What is Milvus?", 2).await.unwrap();

    // plan + reflect + follow-up + synthesis
    assert_eq!(result.tokens_consumed, 10 + 3 + 7 + 20);
    assert_eq!(h.llm.total_calls(), 4);
}

#[tokio::test]
async fn test_evidence_is_deduplicated_in_first_seen_order() {
    let h = Harness::new(
        MockLlm::new(),
        MockIndex::with_results(passages()),
        StoppingKind::Exhaustive,
    );

    let result = h.searcher.query("What is Milvus?", 3).await.unwrap();

    // Every lookup returns the same two passages
    assert_eq!(h.searches(), 4);
    assert_eq!(result.evidence, passages());
}

#[tokio::test]
async fn test_planner_exhaustion_ends_loop() {
    let h = Harness::new(
        MockLlm::new().with_followup(Followup::Fixed("[]".to_string())),
        MockIndex::with_results(passages()),
        StoppingKind::Exhaustive,
    );

    let outcome = h.searcher.retrieve("What is Milvus?", 4).await.unwrap();

    assert_eq!(outcome.metadata.stop_reason, StopReason::PlannerExhausted);
    assert_eq!(outcome.metadata.iterations, 1);
    assert_eq!(h.llm.followup_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.searches(), 2);
    assert_eq!(outcome.tokens_consumed, 10 + 7);
}

#[tokio::test]
async fn test_repeated_followups_count_as_exhausted() {
    let h = Harness::new(
        MockLlm::new().with_followup(Followup::Fixed(
            r#"["FIRST ANGLE", " second angle "]"#.to_string(),
        )),
        MockIndex::with_results(passages()),
        StoppingKind::Exhaustive,
    );

    let outcome = h.searcher.retrieve("What is Milvus?", 3).await.unwrap();

    assert_eq!(outcome.metadata.stop_reason, StopReason::PlannerExhausted);
    assert_eq!(outcome.metadata.sub_queries, vec!["first angle", "second angle"]);
}

#[tokio::test]
async fn test_empty_plan_falls_back_to_original_query() {
    let h = Harness::new(
        MockLlm::new().with_plan("[]"),
        MockIndex::with_results(passages()),
        StoppingKind::Exhaustive,
    );

    let outcome = h.searcher.retrieve("What is Milvus?", 1).await.unwrap();

    assert_eq!(outcome.metadata.sub_queries, vec!["What is Milvus?"]);
    assert_eq!(h.searches(), 1);
}

#[tokio::test]
async fn test_zero_results_still_synthesizes() {
    let h = Harness::new(
        MockLlm::new().with_synth(SynthReply::Fixed(
            "The available evidence is insufficient to answer.".to_string(),
        )),
        MockIndex::empty(),
        StoppingKind::Llm,
    );

    let result = h.searcher.query("What is Milvus?", 3).await.unwrap();

    assert!(result.evidence.is_empty());
    assert!(!result.answer.is_empty());
    assert_eq!(h.llm.synth_calls.load(Ordering::SeqCst), 1);
    // The judge is not consulted without evidence
    assert_eq!(h.llm.reflect_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_synthesis_failure_propagates() {
    let h = Harness::new(
        MockLlm::new().with_synth(SynthReply::Fail),
        MockIndex::with_results(passages()),
        StoppingKind::Exhaustive,
    );

    let err = h.searcher.query("What is Milvus?", 1).await.unwrap_err();
    assert!(matches!(err, AppError::Llm(_)));
    assert!(err.is_provider_error());
}

#[tokio::test]
async fn test_index_failure_propagates_unmodified() {
    let h = Harness::new(MockLlm::new(), MockIndex::failing(), StoppingKind::Exhaustive);

    let err = h.searcher.query("What is Milvus?", 2).await.unwrap_err();
    match err {
        AppError::VectorIndex(msg) => assert_eq!(msg, "index offline"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.llm.synth_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_planning_failure_propagates() {
    let h = Harness::new(
        MockLlm::new().failing_planning(),
        MockIndex::with_results(passages()),
        StoppingKind::Exhaustive,
    );

    assert!(matches!(
        h.searcher.query("What is Milvus?", 2).await,
        Err(AppError::Llm(_))
    ));
    assert_eq!(h.searches(), 0);
}

#[tokio::test]
async fn test_capital_of_france_from_sqlite_collection() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(SqliteIndex::open(&dir.path().join("index.sqlite")).unwrap());
    let embedder = Arc::new(TrigramProvider::new(384));

    let texts = [
        ("geo.md", "Paris is the capital of France."),
        ("geo.md", "Berlin is the capital of Germany."),
        ("food.md", "Pasta should be cooked in salted water."),
    ];
    let mut chunks = Vec::new();
    for (position, (reference, text)) in texts.iter().enumerate() {
        chunks.push(IndexedChunk {
            reference: reference.to_string(),
            position: position as u32,
            text: text.to_string(),
            embedding: embedder.embed(text).await.unwrap(),
            metadata: serde_json::Map::new(),
        });
    }
    index.upsert(&chunks).await.unwrap();

    let llm = Arc::new(
        MockLlm::new()
            .with_plan(r#"["capital of France"]"#)
            .with_synth(SynthReply::EchoEvidence),
    );
    let config = SearchConfig {
        top_k: 1,
        ..SearchConfig::default()
    };
    let searcher = Searcher::new(embedder, index, llm.clone(), config)
        .with_stopping_policy(Arc::new(Exhaustive));

    let result = searcher
        .query("What is the capital of France?", 1)
        .await
        .unwrap();

    assert!(result.answer.contains("Paris"));
    assert!(result.tokens_consumed > 0);
    assert_eq!(result.evidence.len(), 1);
    assert_eq!(
        result.evidence[0],
        RetrievalResult {
            score: result.evidence[0].score,
            ..RetrievalResult::new("Paris is the capital of France.", "geo.md", 0.0)
        }
    );
}
