//! Sufficiency decisions between rounds.
//!
//! The searcher never relies on a policy for termination: it stops after
//! round `max_iter - 1` whatever the policy says.

use crate::rag::evidence::EvidenceSet;
use deepsearch_core::{AppResult, StoppingKind};
use deepsearch_llm::{LlmClient, LlmRequest};
use deepsearch_prompt::{build_prompt, builtin, PromptSet};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of one sufficiency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopDecision {
    pub stop: bool,
    /// Tokens the decision cost (zero for deterministic policies)
    pub tokens: u64,
}

impl StopDecision {
    pub fn proceed() -> Self {
        Self {
            stop: false,
            tokens: 0,
        }
    }
}

/// Decides after a round whether the gathered evidence suffices.
#[async_trait::async_trait]
pub trait StoppingPolicy: Send + Sync {
    fn name(&self) -> &str;

    async fn should_stop(
        &self,
        original_query: &str,
        evidence: &EvidenceSet,
        iteration: usize,
        max_iter: usize,
    ) -> AppResult<StopDecision>;
}

/// Asks the language model whether the evidence answers the question.
pub struct LlmJudge {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
}

impl LlmJudge {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>) -> Self {
        Self { llm, prompts }
    }
}

#[async_trait::async_trait]
impl StoppingPolicy for LlmJudge {
    fn name(&self) -> &str {
        "llm"
    }

    async fn should_stop(
        &self,
        original_query: &str,
        evidence: &EvidenceSet,
        _iteration: usize,
        _max_iter: usize,
    ) -> AppResult<StopDecision> {
        // Nothing to judge yet
        if evidence.is_empty() {
            return Ok(StopDecision::proceed());
        }

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), original_query.to_string());
        vars.insert("evidence".to_string(), evidence.render_for_prompt());

        let built = build_prompt(self.prompts.get(builtin::REFLECT)?, vars)?;
        let mut request = LlmRequest::new(built.user, self.llm.default_model())
            .with_temperature(0.0)
            .with_max_tokens(8);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.llm.complete(&request).await?;
        let stop = is_affirmative(&response.content);
        tracing::debug!("Sufficiency judge answered {:?}", response.content.trim());

        Ok(StopDecision {
            stop,
            tokens: response.total_tokens(),
        })
    }
}

fn is_affirmative(answer: &str) -> bool {
    answer
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_uppercase()
        .starts_with("YES")
}

/// Stops once the evidence set holds at least `min_results` passages.
pub struct EvidenceThreshold {
    min_results: usize,
}

impl EvidenceThreshold {
    pub fn new(min_results: usize) -> Self {
        Self { min_results }
    }
}

#[async_trait::async_trait]
impl StoppingPolicy for EvidenceThreshold {
    fn name(&self) -> &str {
        "threshold"
    }

    async fn should_stop(
        &self,
        _original_query: &str,
        evidence: &EvidenceSet,
        _iteration: usize,
        _max_iter: usize,
    ) -> AppResult<StopDecision> {
        Ok(StopDecision {
            stop: evidence.len() >= self.min_results,
            tokens: 0,
        })
    }
}

/// Never stops early.
pub struct Exhaustive;

#[async_trait::async_trait]
impl StoppingPolicy for Exhaustive {
    fn name(&self) -> &str {
        "exhaustive"
    }

    async fn should_stop(
        &self,
        _original_query: &str,
        _evidence: &EvidenceSet,
        _iteration: usize,
        _max_iter: usize,
    ) -> AppResult<StopDecision> {
        Ok(StopDecision::proceed())
    }
}

/// Build the configured policy.
pub fn create_policy(
    kind: StoppingKind,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    min_results: usize,
) -> Arc<dyn StoppingPolicy> {
    match kind {
        StoppingKind::Llm => Arc::new(LlmJudge::new(llm, prompts)),
        StoppingKind::Threshold => Arc::new(EvidenceThreshold::new(min_results)),
        StoppingKind::Exhaustive => Arc::new(Exhaustive),
    }
}
