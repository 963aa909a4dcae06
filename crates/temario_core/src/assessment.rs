//! Quiz questions and flashcards derived from a topic body.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of answer options every question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Question difficulty.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    /// Recall of a literal fact
    #[serde(alias = "facil", alias = "fácil")]
    Easy,
    /// Requires relating two facts
    #[default]
    #[serde(alias = "media")]
    Medium,
    /// Requires applying the rule to a case
    #[serde(alias = "dificil", alias = "difícil")]
    Hard,
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Question text
    #[serde(alias = "question")]
    pub stem: String,
    /// Answer options, exactly four when well-formed
    pub options: Vec<String>,
    /// Zero-based index of the correct option
    #[serde(alias = "correct", alias = "answer")]
    pub correct_index: usize,
    /// Why the correct option is correct
    #[serde(default, alias = "explanation")]
    pub rationale: String,
    /// Difficulty level
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Question {
    /// Structural problems with this question, empty when well-formed.
    ///
    /// # Examples
    ///
    /// ```
    /// use temario_core::{Difficulty, Question};
    ///
    /// let question = Question {
    ///     stem: "¿Cuántos artículos tiene la Constitución?".to_string(),
    ///     options: vec!["169".into(), "1".into(), "200".into()],
    ///     correct_index: 0,
    ///     rationale: String::new(),
    ///     difficulty: Difficulty::Easy,
    /// };
    /// assert!(!question.problems().is_empty());
    /// ```
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.stem.trim().is_empty() {
            problems.push("empty stem".to_string());
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            problems.push(format!(
                "{} options, {} required",
                self.options.len(),
                OPTIONS_PER_QUESTION
            ));
        }
        if self.options.iter().any(|option| option.trim().is_empty()) {
            problems.push("blank option".to_string());
        }
        if self.correct_index >= self.options.len() {
            problems.push(format!("correct index {} out of range", self.correct_index));
        }
        problems
    }

    /// True when [`Question::problems`] is empty.
    pub fn is_well_formed(&self) -> bool {
        self.problems().is_empty()
    }
}

/// One flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Flashcard {
    /// Key used for duplicate detection: lowercase, whitespace collapsed.
    pub fn dedup_key(&self) -> (String, String) {
        (normalize(&self.front), normalize(&self.back))
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Remove duplicate flashcards, keeping the first occurrence of each
/// (front, back) pair. Matching ignores case and whitespace differences.
/// Cards with an empty side are dropped. Applying it twice is a no-op.
///
/// # Examples
///
/// ```
/// use temario_core::{dedup_flashcards, Flashcard};
///
/// let card = |front: &str, back: &str| Flashcard {
///     front: front.to_string(),
///     back: back.to_string(),
///     tags: vec![],
/// };
/// let cards = vec![card("Art. 1", "España"), card("  art.   1 ", "ESPAÑA"), card("Art. 2", "Nación")];
/// let unique = dedup_flashcards(cards);
/// assert_eq!(unique.len(), 2);
/// assert_eq!(unique[0].front, "Art. 1");
/// ```
pub fn dedup_flashcards(cards: Vec<Flashcard>) -> Vec<Flashcard> {
    let mut seen = HashSet::new();
    cards
        .into_iter()
        .filter(|card| !card.front.trim().is_empty() && !card.back.trim().is_empty())
        .filter(|card| seen.insert(card.dedup_key()))
        .collect()
}
