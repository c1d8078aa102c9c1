//! Final answer composition.

use crate::rag::evidence::EvidenceSet;
use deepsearch_core::AppResult;
use deepsearch_llm::{LlmClient, LlmRequest};
use deepsearch_prompt::{build_prompt, builtin, PromptSet};
use std::collections::HashMap;
use std::sync::Arc;

/// A synthesized answer and what it cost.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: String,
    pub tokens: u64,
}

/// Writes the answer from accumulated evidence.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>) -> Self {
        Self { llm, prompts }
    }

    /// Runs even when `evidence` is empty; the prompt then asks the model
    /// to state that the evidence is insufficient.
    pub async fn synthesize(
        &self,
        original_query: &str,
        evidence: &EvidenceSet,
    ) -> AppResult<Synthesis> {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), original_query.to_string());
        vars.insert("evidence".to_string(), evidence.render_for_prompt());

        let built = build_prompt(self.prompts.get(builtin::SYNTHESIZE)?, vars)?;
        let mut request = LlmRequest::new(built.user, self.llm.default_model())
            .with_temperature(0.3);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::debug!("Synthesizing answer from {} passages", evidence.len());
        let response = self.llm.complete(&request).await?;

        Ok(Synthesis {
            tokens: response.total_tokens(),
            answer: response.content.trim().to_string(),
        })
    }
}
