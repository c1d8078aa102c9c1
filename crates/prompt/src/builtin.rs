//! Built-in prompt definitions used by the searcher.
//!
//! Each one can be replaced by a workspace file
//! `.deepsearch/prompts/<id>.yml`.

use crate::types::PromptDefinition;

/// Decompose the original question into first-round sub-queries.
pub const PLAN: &str = "search.plan";
/// Propose follow-up sub-queries given the evidence so far.
pub const FOLLOWUP: &str = "search.followup";
/// Judge whether the evidence answers the question.
pub const REFLECT: &str = "search.reflect";
/// Compose the final answer.
pub const SYNTHESIZE: &str = "search.synthesize";

/// All built-in prompt identifiers.
pub const ALL: [&str; 4] = [PLAN, FOLLOWUP, REFLECT, SYNTHESIZE];

const PLAN_TEMPLATE: &str = r#"To answer the question below thoroughly, break it down into at most {{max_sub_queries}} focused sub-questions that can each be answered by searching a document collection. If the question is already simple and focused, return it unchanged as the only sub-question.

Question: {{query}}

Respond with a JSON array of strings and nothing else, for example:
["What is X?", "How does X relate to Y?"]"#;

const FOLLOWUP_TEMPLATE: &str = r#"You are gathering evidence to answer a question. Based on the question, the searches already issued and the passages retrieved so far, propose at most {{max_sub_queries}} new search queries that would fill the remaining gaps. Do not repeat earlier searches. If no further search is needed, respond with an empty array.

Question: {{query}}

Searches already issued:
{{issued}}

Retrieved passages:
{{evidence}}

Respond with a JSON array of strings and nothing else."#;

const REFLECT_TEMPLATE: &str = r#"Decide whether the retrieved passages below contain enough information to fully answer the question.

Question: {{query}}

Retrieved passages:
{{evidence}}

Respond with exactly one word: YES if the passages are sufficient, NO otherwise."#;

const SYNTHESIZE_TEMPLATE: &str = r#"Answer the question using only the retrieved passages below. Cite the sources you rely on. If the passages do not contain enough information, say plainly that the available evidence is insufficient to answer, and summarize what is missing.

Question: {{query}}

Retrieved passages:
{{evidence}}

Answer:"#;

/// Return the built-in definition for a prompt id.
pub fn definition(id: &str) -> Option<PromptDefinition> {
    let (title, system, template) = match id {
        PLAN => (
            "Plan sub-queries",
            Some("You are a research assistant that plans searches over a document collection."),
            PLAN_TEMPLATE,
        ),
        FOLLOWUP => (
            "Plan follow-up sub-queries",
            Some("You are a research assistant that plans searches over a document collection."),
            FOLLOWUP_TEMPLATE,
        ),
        REFLECT => ("Judge evidence sufficiency", None, REFLECT_TEMPLATE),
        SYNTHESIZE => (
            "Synthesize answer",
            Some("You answer questions strictly from the supplied evidence."),
            SYNTHESIZE_TEMPLATE,
        ),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        system: system.map(str::to_string),
        template: template.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_resolves() {
        for id in ALL {
            let def = definition(id).unwrap();
            assert_eq!(def.id, id);
            assert!(def.template.contains("{{query}}"));
        }
    }

    #[test]
    fn test_unknown_id() {
        assert!(definition("agent.ask.default").is_none());
    }
}
