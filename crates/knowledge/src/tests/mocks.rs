//! Scripted adapters for orchestrator tests.

use crate::embeddings::EmbeddingProvider;
use crate::rag::Searcher;
use crate::types::RetrievalResult;
use crate::vector_index::{IndexedChunk, VectorIndex};
use deepsearch_core::{AppError, AppResult, SearchConfig, StoppingKind};
use deepsearch_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How the mock answers follow-up planning.
#[derive(Debug, Clone)]
pub enum Followup {
    /// Same reply every time
    Fixed(String),
    /// A never-before-seen sub-query on each call
    Fresh,
}

/// How the mock answers synthesis.
#[derive(Debug, Clone)]
pub enum SynthReply {
    Fixed(String),
    /// Repeat the passages block from the prompt
    EchoEvidence,
    Fail,
}

/// Language model that routes on the built-in prompt wording.
pub struct MockLlm {
    plan_reply: String,
    followup: Followup,
    reflect_reply: String,
    synth: SynthReply,
    fail_planning: bool,
    fail_reflect: bool,
    pub plan_tokens: u32,
    pub followup_tokens: u32,
    pub reflect_tokens: u32,
    pub synth_tokens: u32,
    pub plan_calls: AtomicUsize,
    pub followup_calls: AtomicUsize,
    pub reflect_calls: AtomicUsize,
    pub synth_calls: AtomicUsize,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            plan_reply: r#"["first angle", "second angle"]"#.to_string(),
            followup: Followup::Fresh,
            reflect_reply: "NO".to_string(),
            synth: SynthReply::Fixed("A grounded answer.".to_string()),
            fail_planning: false,
            fail_reflect: false,
            plan_tokens: 10,
            followup_tokens: 7,
            reflect_tokens: 3,
            synth_tokens: 20,
            plan_calls: AtomicUsize::new(0),
            followup_calls: AtomicUsize::new(0),
            reflect_calls: AtomicUsize::new(0),
            synth_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_plan(mut self, reply: &str) -> Self {
        self.plan_reply = reply.to_string();
        self
    }

    pub fn with_followup(mut self, followup: Followup) -> Self {
        self.followup = followup;
        self
    }

    pub fn with_reflect(mut self, reply: &str) -> Self {
        self.reflect_reply = reply.to_string();
        self
    }

    pub fn with_synth(mut self, synth: SynthReply) -> Self {
        self.synth = synth;
        self
    }

    pub fn failing_planning(mut self) -> Self {
        self.fail_planning = true;
        self
    }

    pub fn failing_reflect(mut self) -> Self {
        self.fail_reflect = true;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
            + self.followup_calls.load(Ordering::SeqCst)
            + self.reflect_calls.load(Ordering::SeqCst)
            + self.synth_calls.load(Ordering::SeqCst)
    }

    fn reply(content: String, tokens: u32) -> AppResult<LlmResponse> {
        Ok(LlmResponse {
            content,
            model: "mock".to_string(),
            usage: LlmUsage::new(tokens, 0),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlm {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let prompt = &request.prompt;

        if prompt.contains("break it down") {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_planning {
                return Err(AppError::Llm("planner unavailable".to_string()));
            }
            return Self::reply(self.plan_reply.clone(), self.plan_tokens);
        }

        if prompt.contains("Searches already issued") {
            let n = self.followup_calls.fetch_add(1, Ordering::SeqCst);
            let content = match &self.followup {
                Followup::Fixed(reply) => reply.clone(),
                Followup::Fresh => format!("[\"follow-up {}\"]", n + 1),
            };
            return Self::reply(content, self.followup_tokens);
        }

        if prompt.contains("exactly one word") {
            self.reflect_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_reflect {
                return Err(AppError::Llm("judge quota exceeded".to_string()));
            }
            return Self::reply(self.reflect_reply.clone(), self.reflect_tokens);
        }

        self.synth_calls.fetch_add(1, Ordering::SeqCst);
        match &self.synth {
            SynthReply::Fixed(answer) => Self::reply(answer.clone(), self.synth_tokens),
            SynthReply::EchoEvidence => {
                let passages = prompt
                    .split("Retrieved passages:")
                    .nth(1)
                    .and_then(|rest| rest.split("Answer:").next())
                    .unwrap_or_default()
                    .trim();
                Self::reply(format!("From the evidence: {}", passages), self.synth_tokens)
            }
            SynthReply::Fail => Err(AppError::Llm("synthesis model timed out".to_string())),
        }
    }
}

/// Constant embeddings; counts calls.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Returns the same passages for every lookup.
#[derive(Debug, Default)]
pub struct MockIndex {
    results: Vec<RetrievalResult>,
    fail: bool,
    pub searches: AtomicUsize,
}

impl MockIndex {
    pub fn with_results(results: Vec<RetrievalResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl VectorIndex for MockIndex {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<RetrievalResult>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::VectorIndex("index offline".to_string()));
        }
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    async fn upsert(&self, chunks: &[IndexedChunk]) -> AppResult<usize> {
        Ok(chunks.len())
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.results.len())
    }
}

pub fn passages() -> Vec<RetrievalResult> {
    vec![
        RetrievalResult::new("Milvus is a vector database.", "milvus.md", 0.92),
        RetrievalResult::new("It supports HNSW and IVF indexes.", "milvus.md", 0.81),
    ]
}

/// Adapters plus a searcher wired to them.
pub struct Harness {
    pub llm: Arc<MockLlm>,
    pub embedder: Arc<MockEmbedder>,
    pub index: Arc<MockIndex>,
    pub searcher: Arc<Searcher>,
}

impl Harness {
    pub fn new(llm: MockLlm, index: MockIndex, stopping: StoppingKind) -> Self {
        Self::with_capacity(llm, index, stopping, crate::rag::DEFAULT_STREAM_CAPACITY)
    }

    pub fn with_capacity(
        llm: MockLlm,
        index: MockIndex,
        stopping: StoppingKind,
        capacity: usize,
    ) -> Self {
        let llm = Arc::new(llm);
        let embedder = Arc::new(MockEmbedder::default());
        let index = Arc::new(index);
        let config = SearchConfig {
            top_k: 5,
            stopping,
            ..SearchConfig::default()
        };

        let searcher = Searcher::new(embedder.clone(), index.clone(), llm.clone(), config)
            .with_stream_capacity(capacity);

        Self {
            llm,
            embedder,
            index,
            searcher: Arc::new(searcher),
        }
    }

    pub fn searches(&self) -> usize {
        self.index.searches.load(Ordering::SeqCst)
    }
}
