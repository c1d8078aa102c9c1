//! Prompt system for DeepSearch.
//!
//! This crate provides structured prompt management with:
//! - Built-in prompts for planning, reflection and synthesis
//! - YAML overrides under `.deepsearch/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_template};
pub use loader::{list_prompts, load_prompt, PromptSet};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
