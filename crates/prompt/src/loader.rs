//! Prompt loader for YAML prompt overrides.

use crate::builtin;
use crate::types::PromptDefinition;
use deepsearch_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directory holding prompt overrides, relative to the workspace root.
pub const PROMPTS_DIR: &str = ".deepsearch/prompts";

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(PROMPTS_DIR)
}

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in `.deepsearch/prompts/`.
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all prompt override IDs in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

/// The searcher's prompts, with workspace overrides applied.
#[derive(Debug, Clone)]
pub struct PromptSet {
    definitions: HashMap<String, PromptDefinition>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptSet {
    /// Only the built-in definitions.
    pub fn builtin() -> Self {
        let definitions = builtin::ALL
            .iter()
            .filter_map(|id| builtin::definition(id).map(|def| (id.to_string(), def)))
            .collect();
        Self { definitions }
    }

    /// Built-ins, replaced by any `.deepsearch/prompts/<id>.yml` present in the workspace.
    ///
    /// A malformed override is an error rather than a silent fallback.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut set = Self::builtin();
        let overrides = list_prompts(workspace_path)?;

        for id in builtin::ALL {
            if overrides.iter().any(|o| o == id) {
                let def = load_prompt(workspace_path, id)?;
                set.definitions.insert(id.to_string(), def);
            }
        }

        Ok(set)
    }

    /// Look up a definition by id.
    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        let dir = prompts_dir(dir);
        fs::create_dir_all(&dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Terse synthesis"
apiVersion: "1.0"
template: "Q: {{{{query}}}}\n{{{{evidence}}}}"
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "search.synthesize", true);

        let prompt = load_prompt(temp_dir.path(), "search.synthesize").unwrap();
        assert_eq!(prompt.id, "search.synthesize");
        assert_eq!(prompt.title, "Terse synthesis");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "invalid", false);
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "prompt2", true);
        create_test_prompt(temp_dir.path(), "prompt1", true);

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["prompt1".to_string(), "prompt2".to_string()]);
    }

    #[test]
    fn test_prompt_set_without_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let set = PromptSet::load(temp_dir.path()).unwrap();

        for id in builtin::ALL {
            assert_eq!(set.get(id).unwrap().id, id);
        }
        assert!(set.get("missing").is_err());
    }

    #[test]
    fn test_prompt_set_applies_override() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), builtin::SYNTHESIZE, true);

        let set = PromptSet::load(temp_dir.path()).unwrap();
        assert_eq!(set.get(builtin::SYNTHESIZE).unwrap().title, "Terse synthesis");
        assert_eq!(set.get(builtin::PLAN).unwrap().title, "Plan sub-queries");
    }

    #[test]
    fn test_prompt_set_rejects_broken_override() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), builtin::REFLECT, false);

        assert!(PromptSet::load(temp_dir.path()).is_err());
    }
}
