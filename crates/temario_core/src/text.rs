//! Text helpers: slugs, word counts, generated bodies.

use serde::{Deserialize, Serialize};

/// Body text returned by the content generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBody {
    /// Markdown body
    pub text: String,
    /// Word count of `text`
    pub word_count: usize,
}

impl GeneratedBody {
    /// Wrap text, computing its word count.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = count_words(&text);
        Self { text, word_count }
    }
}

/// Count whitespace-separated tokens containing at least one alphanumeric
/// character. Markdown punctuation (`#`, `-`, `|`) does not count.
///
/// # Examples
///
/// ```
/// use temario_core::count_words;
///
/// assert_eq!(count_words("## Objetivos\n- Conocer el artículo 1 | --- |"), 5);
/// ```
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count()
}

/// Derive a stable lowercase-hyphenated slug from a title.
///
/// Spanish diacritics are folded to ASCII; any other run of non-alphanumeric
/// characters becomes a single hyphen.
///
/// # Examples
///
/// ```
/// use temario_core::slugify;
///
/// assert_eq!(
///     slugify("Tema 3: La Constitución Española de 1978"),
///     "tema-3-la-constitucion-espanola-de-1978"
/// );
/// assert_eq!(slugify("  ¿Qué es el BOE?  "), "que-es-el-boe");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        let folded = fold_diacritic(ch);
        if folded.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(folded);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

fn fold_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}
