//! Content reduction for oversized PDF renders.

use crate::validator::heading_marker;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static HEADING_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s").expect("Valid heading level regex"));
static FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(```|~~~)").expect("Valid fence regex"));
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("Valid image regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("Valid link regex"));
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\*\*|__|\*|`)").expect("Valid emphasis regex"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("Valid html regex"));
static RULE_OR_TABLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-{3,}|\*{3,}|_{3,}|\|?[\s:|-]*-{3,}[\s:|-]*)\s*$")
        .expect("Valid separator regex")
});
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Valid blank line regex"));

/// Appended when the character cap cut the text.
pub const TRUNCATION_NOTICE: &str = "[Contenido abreviado para la versión PDF]";

/// Shrink a markdown body for a second, smaller render.
///
/// Optional sections (examples, applied practice, diagrams) are removed
/// together with their subsections, fenced blocks are dropped, inline
/// formatting is stripped and the result is cut to `char_cap` characters.
/// Headings keep their `#` markers so the renderer still sees structure.
///
/// # Examples
///
/// ```
/// use temario_pipeline::reduce_for_pdf;
///
/// let body = "# Tema\n\n## 1. Marco\n\nTexto **clave**.\n\n## Ejemplos\n\nUn ejemplo.\n\n## Resumen\n\nFin.";
/// let reduced = reduce_for_pdf(body, 10_000);
/// assert!(reduced.contains("Texto clave."));
/// assert!(!reduced.contains("Un ejemplo"));
/// assert!(reduced.contains("## Resumen"));
/// ```
pub fn reduce_for_pdf(markdown: &str, char_cap: usize) -> String {
    let without_optional = drop_optional_sections(markdown);
    let plain = strip_formatting(&without_optional);
    let reduced = cap_chars(&plain, char_cap);
    debug!(
        original_chars = markdown.chars().count(),
        reduced_chars = reduced.chars().count(),
        "Content reduced for PDF"
    );
    reduced
}

fn drop_optional_sections(markdown: &str) -> String {
    let mut kept = Vec::new();
    // Level of the optional heading currently being skipped.
    let mut skipping: Option<usize> = None;
    let mut in_fence = false;

    for line in markdown.lines() {
        if FENCE_LINE.is_match(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(level) = heading_level(line) {
            if let Some(skip_level) = skipping {
                if level > skip_level {
                    continue;
                }
                skipping = None;
            }
            if heading_marker(line).is_some_and(|marker| marker.is_optional_for_pdf()) {
                skipping = Some(level);
                continue;
            }
        } else if skipping.is_some() {
            continue;
        }

        kept.push(line);
    }

    kept.join("\n")
}

fn heading_level(line: &str) -> Option<usize> {
    HEADING_LEVEL
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|level| level.as_str().len())
}

fn strip_formatting(markdown: &str) -> String {
    let lines: Vec<String> = markdown
        .lines()
        .filter(|line| !RULE_OR_TABLE_SEPARATOR.is_match(line))
        .map(|line| {
            let line = IMAGE.replace_all(line, "");
            let line = LINK.replace_all(&line, "$1");
            let line = HTML_TAG.replace_all(&line, "");
            EMPHASIS.replace_all(&line, "").trim_end().to_string()
        })
        .collect();

    BLANK_RUNS
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn cap_chars(text: &str, char_cap: usize) -> String {
    if text.chars().count() <= char_cap {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(char_cap)
        .map_or(text.len(), |(index, _)| index);
    let head = &text[..cut];
    // Prefer ending on a paragraph boundary when one is reasonably close.
    let end = match head.rfind("\n\n") {
        Some(boundary) if boundary >= cut / 2 => boundary,
        _ => cut,
    };

    format!("{}\n\n{}", head[..end].trim_end(), TRUNCATION_NOTICE)
}
