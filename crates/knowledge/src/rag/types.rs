//! Search result types.

use crate::types::RetrievalResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the iteration loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The stopping policy judged the evidence sufficient
    Sufficient,
    /// `max_iter` rounds ran
    MaxIterations,
    /// A follow-up round produced no new sub-queries
    PlannerExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sufficient => "sufficient",
            Self::MaxIterations => "max_iterations",
            Self::PlannerExhausted => "planner_exhausted",
        };
        f.write_str(s)
    }
}

/// Per-round scratch state, discarded once merged into the evidence set.
#[derive(Debug, Clone)]
pub struct IterationState {
    /// 0-based, always below `max_iter`
    pub iteration: usize,
    pub sub_queries: Vec<String>,
    pub new_results: Vec<RetrievalResult>,
    /// Running token total after this round's planning call
    pub tokens: u64,
}

/// How a retrieval run unfolded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMetadata {
    /// Rounds actually executed
    pub iterations: usize,
    /// Every sub-query issued, in order
    pub sub_queries: Vec<String>,
    pub stop_reason: StopReason,
}

/// Evidence gathered without synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub evidence: Vec<RetrievalResult>,
    pub tokens_consumed: u64,
    pub metadata: RetrievalMetadata,
}

/// Answer to one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    /// Passages in first-seen order, duplicates removed
    pub evidence: Vec<RetrievalResult>,
    /// Sum of all language-model tokens spent on this query
    pub tokens_consumed: u64,
}
