//! Text extraction for loadable documents.
//!
//! Each file is classified by extension and reduced to the plain text that
//! gets chunked and embedded. The classification travels with the text so
//! the loader can record it on every chunk.

use deepsearch_core::{AppError, AppResult};
use std::path::Path;

/// Kind of document a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    Json,
    Code,
    Text,
}

impl ContentType {
    /// Classify by extension. Unrecognised extensions are treated as text and
    /// sniffed for binary content when read.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("md" | "markdown" | "mdx") => Self::Markdown,
            Some("html" | "htm" | "xhtml") => Self::Html,
            Some("json" | "jsonl") => Self::Json,
            Some(
                "rs" | "py" | "js" | "ts" | "go" | "c" | "h" | "cpp" | "java" | "sh" | "sql"
                | "toml" | "yaml" | "yml",
            ) => Self::Code,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Json => "json",
            Self::Code => "code",
            Self::Text => "text",
        }
    }
}

/// Extracted text plus the type it was parsed as.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub content_type: ContentType,
    pub text: String,
}

/// Read and parse a file from disk.
///
/// Non-UTF-8 or NUL-containing files are rejected as binary.
pub fn parse_file(path: &Path) -> AppResult<ParsedDocument> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    let raw = String::from_utf8(bytes)
        .map_err(|_| AppError::Knowledge(format!("Not a UTF-8 text file: {:?}", path)))?;

    parse_text(path, &raw)
}

/// Parse already-read contents of `path`.
pub fn parse_text(path: &Path, raw: &str) -> AppResult<ParsedDocument> {
    if raw.contains('\0') {
        return Err(AppError::Knowledge(format!("Binary file not supported: {:?}", path)));
    }

    let raw = raw.replace("\r\n", "\n");
    let content_type = ContentType::from_path(path);

    let text = match content_type {
        ContentType::Markdown => markdown_text(&raw),
        ContentType::Html => html_text(&raw),
        ContentType::Json => json_text(path, &raw)?,
        ContentType::Code => code_text(&raw),
        ContentType::Text => raw.trim().to_string(),
    };

    Ok(ParsedDocument { content_type, text })
}

/// Drop heading markers, rules, fences and image lines; keep fenced code.
fn markdown_text(raw: &str) -> String {
    let mut lines = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```")
            || trimmed.starts_with("~~~")
            || trimmed.starts_with("![")
            || is_rule(trimmed)
        {
            continue;
        }

        let text = trimmed.trim_start_matches('#').trim();
        if !text.is_empty() {
            lines.push(text);
        }
    }

    lines.join("\n")
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|&mark| line.chars().all(|c| c == mark || c == ' '))
}

/// Strip tags, `<script>`/`<style>` bodies and common entities.
fn html_text(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    let mut skip_until: Option<&str> = None;

    for (i, ch) in raw.char_indices() {
        if let Some(close) = skip_until {
            if lower[i..].starts_with(close) {
                skip_until = None;
                in_tag = true;
            }
            continue;
        }

        match ch {
            '<' => {
                in_tag = true;
                if lower[i..].starts_with("<script") {
                    skip_until = Some("</script");
                } else if lower[i..].starts_with("<style") {
                    skip_until = Some("</style");
                }
                // Tags separate words
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    let decoded = decode_entities(&out);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    [
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&amp;", "&"),
    ]
    .iter()
    .fold(text.to_string(), |acc, &(entity, ch)| acc.replace(entity, ch))
}

/// Collect every string value, one per line. `.jsonl` files are read
/// record by record.
fn json_text(path: &Path, raw: &str) -> AppResult<String> {
    let parse = |s: &str| {
        serde_json::from_str::<serde_json::Value>(s)
            .map_err(|e| AppError::Knowledge(format!("Invalid JSON in {:?}: {}", path, e)))
    };

    let is_lines = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jsonl"));

    let values = if is_lines {
        raw.lines()
            .filter(|l| !l.trim().is_empty())
            .map(parse)
            .collect::<AppResult<Vec<_>>>()?
    } else {
        vec![parse(raw)?]
    };

    let mut strings = Vec::new();
    for value in &values {
        collect_strings(value, &mut strings);
    }
    Ok(strings.join("\n"))
}

fn collect_strings<'a>(value: &'a serde_json::Value, out: &mut Vec<&'a str>) {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => out.push(s.trim()),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Source is kept verbatim, comments included; only trailing whitespace and
/// runs of blank lines are squeezed.
fn code_text(raw: &str) -> String {
    let mut out = Vec::new();
    let mut blank = false;

    for line in raw.lines().map(str::trim_end) {
        if line.is_empty() {
            if !blank && !out.is_empty() {
                out.push(line);
            }
            blank = true;
        } else {
            out.push(line);
            blank = false;
        }
    }

    out.join("\n").trim_end().to_string()
}
