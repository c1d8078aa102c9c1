//! Iterative search orchestration.
//!
//! A search runs up to `max_iter` rounds of plan → retrieve → merge → judge,
//! then synthesizes an answer from everything gathered. The streaming entry
//! point drives the same loop and reports each step as a [`StreamEvent`].

use crate::embeddings::EmbeddingProvider;
use crate::rag::evidence::EvidenceAccumulator;
use crate::rag::planner::QueryPlanner;
use crate::rag::stopping::{create_policy, StoppingPolicy};
use crate::rag::stream::{EventSink, SearchStage, StreamEvent};
use crate::rag::synthesizer::AnswerSynthesizer;
use crate::rag::types::{
    IterationState, QueryResult, RetrievalMetadata, RetrievalOutcome, StopReason,
};
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use deepsearch_core::{AppError, AppResult, SearchConfig};
use deepsearch_llm::LlmClient;
use deepsearch_prompt::PromptSet;
use futures::future::try_join_all;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

/// Pending events a streaming search may buffer ahead of its consumer.
pub const DEFAULT_STREAM_CAPACITY: usize = 32;

/// Agentic retrieval-augmented search over one vector index.
///
/// Adapters are shared and must tolerate concurrent use; everything else a
/// search touches is owned by that invocation.
pub struct Searcher {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    stopping: Option<Arc<dyn StoppingPolicy>>,
    config: SearchConfig,
    stream_capacity: usize,
}

impl Searcher {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        config: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            prompts: Arc::new(PromptSet::builtin()),
            stopping: None,
            config,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Use workspace prompt overrides instead of the built-in templates.
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Replace the policy selected by `config.stopping`.
    pub fn with_stopping_policy(mut self, policy: Arc<dyn StoppingPolicy>) -> Self {
        self.stopping = Some(policy);
        self
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn stopping_policy(&self) -> Arc<dyn StoppingPolicy> {
        match &self.stopping {
            Some(policy) => Arc::clone(policy),
            None => create_policy(
                self.config.stopping,
                Arc::clone(&self.llm),
                Arc::clone(&self.prompts),
                self.config.min_results,
            ),
        }
    }

    /// Answer `original_query` from up to `max_iter` rounds of retrieval.
    ///
    /// Provider failures propagate unmodified; no partial answer is returned.
    pub async fn query(&self, original_query: &str, max_iter: usize) -> AppResult<QueryResult> {
        let span = tracing::info_span!("search", query = %original_query, max_iter, mode = "query");
        async {
            let (acc, metadata) = self
                .run_retrieval(original_query, max_iter, &EventSink::disabled())
                .await?;
            let (evidence, mut tokens) = acc.into_parts();

            let synthesis = self.synthesizer().synthesize(original_query, &evidence).await?;
            tokens = tokens.saturating_add(synthesis.tokens);

            tracing::info!(
                iterations = metadata.iterations,
                evidence = evidence.len(),
                tokens,
                "Query answered ({})",
                metadata.stop_reason
            );

            Ok(QueryResult {
                answer: synthesis.answer,
                evidence: evidence.into_vec(),
                tokens_consumed: tokens,
            })
        }
        .instrument(span)
        .await
    }

    /// Gather evidence for `original_query` without synthesizing an answer.
    pub async fn retrieve(
        &self,
        original_query: &str,
        max_iter: usize,
    ) -> AppResult<RetrievalOutcome> {
        let span = tracing::info_span!(
            "search",
            query = %original_query,
            max_iter,
            mode = "retrieve"
        );
        async {
            let (acc, metadata) = self
                .run_retrieval(original_query, max_iter, &EventSink::disabled())
                .await?;
            let (evidence, tokens) = acc.into_parts();

            Ok(RetrievalOutcome {
                evidence: evidence.into_vec(),
                tokens_consumed: tokens,
                metadata,
            })
        }
        .instrument(span)
        .await
    }

    /// Run a search in a background task and stream its progress.
    ///
    /// The stream always ends with `end`, preceded by exactly one `result`
    /// or `error`. Dropping the stream stops the search at the next round
    /// boundary.
    pub fn query_stream(
        self: &Arc<Self>,
        original_query: impl Into<String>,
        max_iter: usize,
    ) -> ReceiverStream<StreamEvent> {
        let original_query = original_query.into();
        let (sink, rx) = EventSink::channel(self.stream_capacity);
        let span = tracing::info_span!(
            "search",
            query = %original_query,
            max_iter,
            mode = "stream"
        );

        let searcher = Arc::clone(self);
        tokio::spawn(
            async move {
                match searcher.produce_events(&original_query, max_iter, &sink).await {
                    Ok(()) => {}
                    Err(AppError::Cancelled(reason)) => {
                        tracing::info!("Streaming search stopped: {}", reason);
                    }
                    Err(e) => {
                        tracing::warn!("Streaming search ended without final events: {}", e);
                    }
                }
            }
            .instrument(span),
        );

        ReceiverStream::new(rx)
    }

    async fn produce_events(
        &self,
        original_query: &str,
        max_iter: usize,
        sink: &EventSink,
    ) -> AppResult<()> {
        sink.emit(StreamEvent::start()).await?;
        sink.emit(StreamEvent::analysis(original_query)).await?;
        sink.emit(StreamEvent::retrieval()).await?;

        let (acc, metadata) = match self.run_retrieval(original_query, max_iter, sink).await {
            Ok(done) => done,
            Err(AppError::Cancelled(reason)) => return Err(AppError::Cancelled(reason)),
            Err(e) => {
                let stage = match &e {
                    AppError::InvalidArgument(_) => SearchStage::Validation,
                    _ => SearchStage::Retrieval,
                };
                tracing::warn!("Search failed during {}: {}", stage, e);
                sink.emit(StreamEvent::error(stage, &e)).await?;
                return sink.emit(StreamEvent::end()).await;
            }
        };

        if sink.is_closed() {
            return Err(AppError::Cancelled("consumer detached before synthesis".to_string()));
        }

        let (evidence, tokens) = acc.into_parts();
        match self.synthesizer().synthesize(original_query, &evidence).await {
            Ok(synthesis) => {
                let total = tokens.saturating_add(synthesis.tokens);
                tracing::info!(
                    iterations = metadata.iterations,
                    evidence = evidence.len(),
                    tokens = total,
                    "Streaming query answered ({})",
                    metadata.stop_reason
                );
                sink.emit(StreamEvent::result(synthesis.answer, total)).await?;
            }
            Err(e) => {
                tracing::warn!("Search failed during synthesis: {}", e);
                sink.emit(StreamEvent::error(SearchStage::Synthesis, &e)).await?;
            }
        }

        sink.emit(StreamEvent::end()).await
    }

    fn synthesizer(&self) -> AnswerSynthesizer {
        AnswerSynthesizer::new(Arc::clone(&self.llm), Arc::clone(&self.prompts))
    }

    /// The iteration loop shared by every entry point.
    async fn run_retrieval(
        &self,
        original_query: &str,
        max_iter: usize,
        sink: &EventSink,
    ) -> AppResult<(EvidenceAccumulator, RetrievalMetadata)> {
        if max_iter == 0 {
            return Err(AppError::InvalidArgument("max_iter must be at least 1".to_string()));
        }

        let planner = QueryPlanner::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.prompts),
            self.config.max_sub_queries,
        );
        let stopping = self.stopping_policy();

        let mut acc = EvidenceAccumulator::new();
        let mut issued: Vec<String> = Vec::new();
        let mut iterations = 0;
        let mut stop_reason = StopReason::MaxIterations;

        for i in 0..max_iter {
            if sink.is_closed() {
                return Err(AppError::Cancelled(format!(
                    "consumer detached before round {}",
                    i + 1
                )));
            }

            let plan = planner.plan(original_query, i, acc.evidence(), &issued).await?;
            acc.add_tokens(plan.tokens);

            sink.emit(StreamEvent::iteration(i, max_iter)).await?;
            if plan.sub_queries.is_empty() {
                sink.emit(StreamEvent::thinking(
                    "No further sub-queries to explore; evidence gathering complete",
                ))
                .await?;
                tracing::debug!(iteration = i, "Planner exhausted");
                stop_reason = StopReason::PlannerExhausted;
                break;
            }
            sink.emit(StreamEvent::thinking(format!(
                "Searching for: {}",
                plan.sub_queries.join("; ")
            )))
            .await?;

            let round = IterationState {
                iteration: i,
                new_results: self.retrieve_round(&plan.sub_queries).await?,
                sub_queries: plan.sub_queries,
                tokens: acc.tokens(),
            };
            iterations += 1;

            let found = round.new_results.len();
            let added = acc.absorb(round.new_results);
            tracing::debug!(
                iteration = round.iteration,
                sub_queries = round.sub_queries.len(),
                found,
                added,
                tokens = round.tokens,
                "Round complete"
            );
            issued.extend(round.sub_queries);

            if i + 1 == max_iter {
                stop_reason = StopReason::MaxIterations;
                break;
            }

            let decision = stopping
                .should_stop(original_query, acc.evidence(), i, max_iter)
                .await?;
            acc.add_tokens(decision.tokens);
            if decision.stop {
                tracing::debug!(iteration = i, policy = stopping.name(), "Evidence sufficient");
                stop_reason = StopReason::Sufficient;
                break;
            }
        }

        Ok((
            acc,
            RetrievalMetadata {
                iterations,
                sub_queries: issued,
                stop_reason,
            },
        ))
    }

    /// Embed and search every sub-query concurrently; results keep
    /// sub-query order.
    async fn retrieve_round(&self, sub_queries: &[String]) -> AppResult<Vec<RetrievalResult>> {
        let top_k = self.config.top_k;
        let lookups = sub_queries.iter().map(|sub_query| async move {
            let vector = self.embedder.embed(sub_query).await?;
            self.index.search(&vector, top_k).await
        });

        let per_query = try_join_all(lookups).await?;
        Ok(per_query.into_iter().flatten().collect())
    }
}
