//! Sub-query planning.

use crate::rag::evidence::EvidenceSet;
use deepsearch_core::AppResult;
use deepsearch_llm::{LlmClient, LlmRequest};
use deepsearch_prompt::{build_prompt, builtin, PromptSet};
use std::collections::HashMap;
use std::sync::Arc;

/// Sub-queries proposed for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub sub_queries: Vec<String>,
    pub tokens: u64,
}

/// Uses the language model to decompose a question into searches.
pub struct QueryPlanner {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    max_sub_queries: usize,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, max_sub_queries: usize) -> Self {
        Self {
            llm,
            prompts,
            max_sub_queries: max_sub_queries.max(1),
        }
    }

    /// Propose sub-queries for round `iteration`.
    ///
    /// Round 0 always yields at least the original query. Later rounds drop
    /// anything already in `issued` and may come back empty, meaning the
    /// planner has nothing left to search for.
    pub async fn plan(
        &self,
        original_query: &str,
        iteration: usize,
        evidence: &EvidenceSet,
        issued: &[String],
    ) -> AppResult<Plan> {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), original_query.to_string());
        vars.insert(
            "max_sub_queries".to_string(),
            self.max_sub_queries.to_string(),
        );

        let prompt_id = if iteration == 0 {
            builtin::PLAN
        } else {
            vars.insert("issued".to_string(), render_issued(issued));
            vars.insert("evidence".to_string(), evidence.render_for_prompt());
            builtin::FOLLOWUP
        };

        let built = build_prompt(self.prompts.get(prompt_id)?, vars)?;
        let mut request = LlmRequest::new(built.user, self.llm.default_model())
            .with_temperature(0.2);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.llm.complete(&request).await?;
        let tokens = response.total_tokens();

        let mut sub_queries = Vec::new();
        for candidate in parse_sub_queries(&response.content) {
            let seen = issued
                .iter()
                .chain(sub_queries.iter())
                .any(|q: &String| same_query(q, &candidate));
            if !seen {
                sub_queries.push(candidate);
            }
        }
        sub_queries.truncate(self.max_sub_queries);

        if iteration == 0 && sub_queries.is_empty() {
            tracing::debug!("Planner returned no sub-queries, using original query");
            sub_queries.push(original_query.to_string());
        }

        tracing::debug!(
            iteration,
            count = sub_queries.len(),
            "Planned sub-queries: {:?}",
            sub_queries
        );

        Ok(Plan {
            sub_queries,
            tokens,
        })
    }
}

fn render_issued(issued: &[String]) -> String {
    if issued.is_empty() {
        return "(none)".to_string();
    }
    issued
        .iter()
        .map(|q| format!("- {}", q))
        .collect::<Vec<_>>()
        .join("\n")
}

fn same_query(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Extract sub-queries from a model response.
///
/// Prefers the first JSON array of strings in the text; otherwise treats
/// each non-empty line (minus list markers) as a query.
pub fn parse_sub_queries(text: &str) -> Vec<String> {
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            if let Ok(items) = serde_json::from_str::<Vec<String>>(&text[start..=end]) {
                return items
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }
    }

    text.lines()
        .map(|line| strip_list_marker(line.trim()).trim_matches('"').to_string())
        .filter(|line| !line.is_empty() && !line.starts_with("```") && line != "[]")
        .collect()
}

/// Remove a leading bullet (`-`, `*`, `•`) or numbered marker (`1.`, `2)`).
fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let parsed = parse_sub_queries(r#"["What is Milvus?", " How does it index? ", ""]"#);
        assert_eq!(parsed, vec!["What is Milvus?", "How does it index?"]);
    }

    #[test]
    fn test_parse_json_inside_prose_and_fences() {
        let text = "Sure! Here you go:\n```json\n[\"capital of France\"]\n```";
        assert_eq!(parse_sub_queries(text), vec!["capital of France"]);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_sub_queries("[]").is_empty());
        assert!(parse_sub_queries("  ").is_empty());
    }

    #[test]
    fn test_parse_line_fallback() {
        let text = "1. What is Rust?\n- Who maintains it?\n\n* \"Why ownership?\"";
        assert_eq!(
            parse_sub_queries(text),
            vec!["What is Rust?", "Who maintains it?", "Why ownership?"]
        );
    }

    #[test]
    fn test_line_fallback_keeps_leading_numbers() {
        let text = "1. 2024 revenue of Milvus\n2) 3 largest vector databases\n- 10x faster indexing\n2024 roadmap";
        assert_eq!(
            parse_sub_queries(text),
            vec![
                "2024 revenue of Milvus",
                "3 largest vector databases",
                "10x faster indexing",
                "2024 roadmap"
            ]
        );
    }

    #[test]
    fn test_same_query_ignores_case_and_space() {
        assert!(same_query(" What is Rust? ", "what is rust?"));
        assert!(!same_query("What is Rust?", "What is Go?"));
    }
}
