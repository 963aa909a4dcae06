//! Utilities for extracting structured data from LLM responses.
//!
//! Models wrap JSON in markdown fences or surround it with commentary. The
//! extractor tries a fenced block first, then the first balanced array or
//! object.

use temario_error::{GenerationError, GenerationErrorKind};

/// Extract JSON from a response that may contain markdown or extra text.
///
/// # Errors
///
/// Returns [`GenerationErrorKind::MissingStructuredOutput`] if nothing that
/// looks like JSON is found.
///
/// # Examples
///
/// ```
/// use temario_models::extract_json;
///
/// let response = "Aquí tienes las preguntas:\n```json\n[{\"front\": \"a\"}]\n```";
/// assert_eq!(extract_json(response).unwrap(), "[{\"front\": \"a\"}]");
///
/// let bare = "Resultado: {\"questions\": []} fin";
/// assert_eq!(extract_json(bare).unwrap(), "{\"questions\": []}");
/// ```
pub fn extract_json(response: &str) -> Result<String, GenerationError> {
    if let Some(json) = extract_from_code_block(response, "json") {
        return Ok(json);
    }

    let bracket_pos = response.find('[');
    let brace_pos = response.find('{');
    let order: [(char, char); 2] = match (bracket_pos, brace_pos) {
        (Some(b), Some(c)) if b < c => [('[', ']'), ('{', '}')],
        (Some(_), None) => [('[', ']'), ('{', '}')],
        _ => [('{', '}'), ('[', ']')],
    };
    for (open, close) in order {
        if let Some(json) = extract_balanced(response, open, close) {
            return Ok(json);
        }
    }

    tracing::error!(
        response_length = response.len(),
        "No JSON found in LLM response"
    );
    Err(GenerationError::new(
        GenerationErrorKind::MissingStructuredOutput(format!(
            "no JSON found in response of {} bytes",
            response.len()
        )),
    ))
}

/// Remove a fence wrapping the whole response (```` ```markdown ... ``` ````).
///
/// Inner fences such as mermaid diagrams are left alone.
///
/// # Examples
///
/// ```
/// use temario_models::strip_markdown_fence;
///
/// assert_eq!(strip_markdown_fence("```markdown\n# Tema\n```"), "# Tema");
/// assert_eq!(strip_markdown_fence("# Tema\n```mermaid\nA-->B\n```"), "# Tema\n```mermaid\nA-->B\n```");
/// ```
pub fn strip_markdown_fence(response: &str) -> &str {
    let trimmed = response.trim();
    for opener in ["```markdown", "```md", "```"] {
        if let Some(rest) = trimmed.strip_prefix(opener)
            && rest.starts_with('\n')
            && let Some(inner) = rest.strip_suffix("```")
        {
            return inner.trim();
        }
    }
    trimmed
}

fn extract_from_code_block(response: &str, language: &str) -> Option<String> {
    let pattern = format!("```{}", language);
    let start = response.find(&pattern)?;
    let content_start = start + pattern.len();
    match response[content_start..].find("```") {
        Some(end) => Some(response[content_start..content_start + end].trim().to_string()),
        // Truncated response: take everything after the fence
        None => Some(response[content_start..].trim().to_string()),
    }
}

/// Content between the first `open` and its matching `close`, skipping
/// delimiters inside JSON strings.
fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(response[start..start + i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
