//! Evidence accumulated across search rounds.

use crate::types::RetrievalResult;
use serde::Serialize;
use std::collections::HashSet;

/// Ordered, duplicate-free passages gathered by one search invocation.
///
/// Insertion order is first-seen order; nothing is ever removed or re-ranked.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSet {
    items: Vec<RetrievalResult>,
    keys: HashSet<String>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievalResult> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[RetrievalResult] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<RetrievalResult> {
        self.items
    }

    /// Whether a passage with the same dedup key is already held.
    pub fn contains(&self, result: &RetrievalResult) -> bool {
        self.keys.contains(&result.dedup_key())
    }

    /// Numbered passages for inclusion in a prompt.
    pub fn render_for_prompt(&self) -> String {
        if self.items.is_empty() {
            return "(no passages retrieved)".to_string();
        }

        self.items
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}] (source: {})\n{}", i + 1, r.source, r.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Serialize for EvidenceSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

/// Merge `incoming` into `existing`, keeping first-seen order.
///
/// Entries whose dedup key is already present (in `existing` or earlier in
/// `incoming`) are dropped. An empty `incoming` returns `existing` unchanged.
pub fn merge(existing: EvidenceSet, incoming: Vec<RetrievalResult>) -> EvidenceSet {
    let mut merged = existing;
    for result in incoming {
        if merged.keys.insert(result.dedup_key()) {
            merged.items.push(result);
        }
    }
    merged
}

/// Evidence plus the running token spend of one invocation.
#[derive(Debug, Default)]
pub struct EvidenceAccumulator {
    evidence: EvidenceSet,
    tokens: u64,
}

impl EvidenceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a round's results; returns how many were new.
    pub fn absorb(&mut self, incoming: Vec<RetrievalResult>) -> usize {
        let before = self.evidence.len();
        self.evidence = merge(std::mem::take(&mut self.evidence), incoming);
        self.evidence.len() - before
    }

    /// Add tokens reported by a language-model call.
    pub fn add_tokens(&mut self, tokens: u64) {
        self.tokens = self.tokens.saturating_add(tokens);
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn evidence(&self) -> &EvidenceSet {
        &self.evidence
    }

    pub fn into_parts(self) -> (EvidenceSet, u64) {
        (self.evidence, self.tokens)
    }
}
