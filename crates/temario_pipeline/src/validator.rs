//! Structural and length checks on generated content.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use temario_core::{ContentProfile, Question, SectionMarker};
use temario_error::{ValidationError, ValidationErrorKind};
use tracing::{debug, warn};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").expect("Valid heading regex"));

static NUMBERED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+\S").expect("Valid numbered title regex"));

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(```|~~~)\s*([A-Za-z0-9_-]*)").expect("Valid fence regex"));

/// Heading titles that identify a named section, matched after any leading
/// numbering ("2. Ejemplos") is stripped.
static NAMED_SECTIONS: LazyLock<Vec<(SectionMarker, Regex)>> = LazyLock::new(|| {
    [
        (SectionMarker::Objectives, r"(?i)^objetivos?\b"),
        (SectionMarker::Examples, r"(?i)^ejemplos?\b"),
        (
            SectionMarker::KeyFacts,
            r"(?i)^(datos|puntos|ideas|conceptos)\s+clave\b",
        ),
        (SectionMarker::Summary, r"(?i)^(resumen|conclusi[oó]n(es)?)\b"),
        (
            SectionMarker::AppliedPractice,
            r"(?i)^(casos?\s+pr[aá]cticos?|supuestos?\s+pr[aá]cticos?|aplicaci[oó]n\s+pr[aá]ctica)\b",
        ),
        (SectionMarker::Diagrams, r"(?i)^(esquemas?|diagramas?)\b"),
    ]
    .into_iter()
    .map(|(marker, pattern)| (marker, Regex::new(pattern).expect("Valid section regex")))
    .collect()
});

static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s*").expect("Valid number prefix regex"));

/// Classify a markdown heading line.
///
/// Level-one headings are the document header. Deeper headings are matched
/// by name first, so "## 3. Resumen" is a summary rather than a core
/// section. Lines that are not headings return `None`.
///
/// # Examples
///
/// ```
/// use temario_core::SectionMarker;
/// use temario_pipeline::heading_marker;
///
/// assert_eq!(heading_marker("# Tema 1"), Some(SectionMarker::Header));
/// assert_eq!(heading_marker("## 2. Ejemplos"), Some(SectionMarker::Examples));
/// assert_eq!(heading_marker("## 1. Marco legal"), Some(SectionMarker::CoreSections));
/// assert_eq!(heading_marker("texto"), None);
/// ```
pub fn heading_marker(line: &str) -> Option<SectionMarker> {
    let captures = HEADING.captures(line.trim_end())?;
    let level = captures.get(1).map_or(0, |m| m.as_str().len());
    let title = captures.get(2).map_or("", |m| m.as_str());

    if level == 1 {
        return Some(SectionMarker::Header);
    }

    let bare_title = NUMBER_PREFIX.replace(title, "");
    if let Some((marker, _)) = NAMED_SECTIONS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&bare_title))
    {
        return Some(*marker);
    }

    NUMBERED_TITLE
        .is_match(title)
        .then_some(SectionMarker::CoreSections)
}

/// Markers present in a markdown body.
///
/// Headings inside fenced code blocks are ignored. A fence tagged `mermaid`
/// counts as a diagram.
pub fn present_markers(text: &str) -> BTreeSet<SectionMarker> {
    let mut found = BTreeSet::new();
    let mut in_fence = false;

    for line in text.lines() {
        if let Some(captures) = FENCE.captures(line) {
            if !in_fence
                && captures
                    .get(2)
                    .is_some_and(|tag| tag.as_str().eq_ignore_ascii_case("mermaid"))
            {
                found.insert(SectionMarker::Diagrams);
            }
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(marker) = heading_marker(line) {
            found.insert(marker);
        }
    }

    found
}

/// Checks generated content against one content profile.
///
/// Validation is a pure function of its inputs: the same text and word
/// count always give the same verdict and the same reasons.
///
/// # Examples
///
/// ```
/// use temario_core::ContentProfile;
/// use temario_pipeline::Validator;
///
/// let validator = Validator::new(&ContentProfile::default());
/// let err = validator.validate("# Tema\n\nPoco texto.", 3).unwrap_err();
/// let message = err.to_string();
/// assert!(message.contains("missing markers: objectives"));
/// assert!(message.contains("word count 3 below minimum 2500"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    min_words: usize,
    tests_per_topic: usize,
    markers: Vec<SectionMarker>,
}

impl Validator {
    /// Build a validator from a profile's thresholds.
    pub fn new(profile: &ContentProfile) -> Self {
        let mut markers = profile.required_markers().clone();
        markers.sort();
        markers.dedup();
        Self {
            min_words: *profile.min_words(),
            tests_per_topic: *profile.tests_per_topic(),
            markers,
        }
    }

    /// Required markers absent from `text`, in declaration order.
    pub fn missing_markers(&self, text: &str) -> Vec<SectionMarker> {
        let present = present_markers(text);
        self.markers
            .iter()
            .filter(|marker| !present.contains(marker))
            .copied()
            .collect()
    }

    /// Validate a body.
    ///
    /// Both the marker check and the length check always run, so a single
    /// failure lists every reason.
    pub fn validate(&self, text: &str, word_count: usize) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        let missing = self.missing_markers(text);
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            reasons.push(format!("missing markers: {}", names.join(", ")));
        }

        if word_count < self.min_words {
            reasons.push(format!(
                "word count {} below minimum {}",
                word_count, self.min_words
            ));
        }

        if reasons.is_empty() {
            debug!(word_count, "Content passed validation");
            Ok(())
        } else {
            Err(ValidationError::new(ValidationErrorKind::Content(reasons)))
        }
    }

    /// Keep the well-formed questions and cut the set to the profile size.
    ///
    /// Fails when fewer well-formed questions remain than the profile
    /// requires.
    pub fn select_questions(&self, questions: Vec<Question>) -> Result<Vec<Question>, ValidationError> {
        let supplied = questions.len();
        let mut valid: Vec<Question> = questions
            .into_iter()
            .enumerate()
            .filter_map(|(index, question)| {
                let problems = question.problems();
                if problems.is_empty() {
                    Some(question)
                } else {
                    warn!(index, problems = %problems.join("; "), "Dropping malformed question");
                    None
                }
            })
            .collect();

        if valid.len() < self.tests_per_topic {
            return Err(ValidationError::new(ValidationErrorKind::TestSetShort {
                valid: valid.len(),
                required: self.tests_per_topic,
            }));
        }

        valid.truncate(self.tests_per_topic);
        debug!(supplied, kept = valid.len(), "Question set selected");
        Ok(valid)
    }

    /// Minimum body length in words.
    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Exact question count per topic.
    pub fn tests_per_topic(&self) -> usize {
        self.tests_per_topic
    }
}
