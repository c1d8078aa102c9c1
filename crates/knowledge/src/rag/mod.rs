//! Agentic retrieval-augmented search.
//!
//! [`Searcher`] drives rounds of planning, retrieval and sufficiency checks,
//! then synthesizes an answer. Progress can be streamed as [`StreamEvent`]s.

pub mod evidence;
pub mod planner;
pub mod searcher;
pub mod stopping;
pub mod stream;
pub mod synthesizer;
pub mod types;

pub use evidence::{merge, EvidenceAccumulator, EvidenceSet};
pub use planner::{parse_sub_queries, Plan, QueryPlanner};
pub use searcher::{Searcher, DEFAULT_STREAM_CAPACITY};
pub use stopping::{
    create_policy, EvidenceThreshold, Exhaustive, LlmJudge, StopDecision, StoppingPolicy,
};
pub use stream::{EventSink, SearchStage, StreamEvent};
pub use synthesizer::{AnswerSynthesizer, Synthesis};
pub use types::{IterationState, QueryResult, RetrievalMetadata, RetrievalOutcome, StopReason};
