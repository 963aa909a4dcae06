//! Content profiles: per-assistant generation thresholds.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Structural sections every syllabus body is expected to contain.
///
/// Declaration order is the order the validator reports missing markers in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SectionMarker {
    /// Top-level title heading
    Header,
    /// Learning objectives
    Objectives,
    /// Numbered core sections
    CoreSections,
    /// Worked examples
    Examples,
    /// Key facts to memorise
    KeyFacts,
    /// Closing summary
    Summary,
    /// Applied practice / case study
    AppliedPractice,
    /// Diagrams or schematic outlines
    Diagrams,
}

impl SectionMarker {
    /// Sections the PDF reducer may drop to shrink a render.
    pub fn is_optional_for_pdf(&self) -> bool {
        matches!(
            self,
            SectionMarker::Examples | SectionMarker::AppliedPractice | SectionMarker::Diagrams
        )
    }

    /// Markdown the generator is asked to write for this section.
    pub fn canonical_heading(&self) -> &'static str {
        match self {
            SectionMarker::Header => "# <título del tema>",
            SectionMarker::Objectives => "## Objetivos",
            SectionMarker::CoreSections => "## 1. <sección>, ## 2. <sección>, ...",
            SectionMarker::Examples => "## Ejemplos",
            SectionMarker::KeyFacts => "## Datos clave",
            SectionMarker::Summary => "## Resumen",
            SectionMarker::AppliedPractice => "## Caso práctico",
            SectionMarker::Diagrams => "## Esquema (con un bloque ```mermaid)",
        }
    }
}

fn all_markers() -> Vec<SectionMarker> {
    use strum::IntoEnumIterator;
    SectionMarker::iter().collect()
}

/// Thresholds one assistant's content must satisfy.
///
/// Different assistants historically used different minimums (2500, 2600 or
/// 2800 words; 5 or 20 questions), so they are configured per profile rather
/// than hard-coded.
///
/// # Examples
///
/// ```
/// use temario_core::ContentProfile;
///
/// let profile = ContentProfile::builder()
///     .name("oposiciones")
///     .min_words(2800_usize)
///     .tests_per_topic(20_usize)
///     .min_flashcards(15_usize)
///     .build()
///     .unwrap();
///
/// assert_eq!(*profile.min_words(), 2800);
/// assert_eq!(profile.required_markers().len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Builder)]
#[builder(setter(into))]
pub struct ContentProfile {
    /// Profile name referenced from assistant configuration
    name: String,
    /// Minimum body length in words
    min_words: usize,
    /// Exact number of quiz questions per topic
    tests_per_topic: usize,
    /// Number of flashcards written per topic, after de-duplication
    min_flashcards: usize,
    /// Sections the body must contain
    #[serde(default = "all_markers")]
    #[builder(default = "all_markers()")]
    required_markers: Vec<SectionMarker>,
}

impl ContentProfile {
    /// Create a new builder for constructing a profile.
    pub fn builder() -> ContentProfileBuilder {
        ContentProfileBuilder::default()
    }
}

impl Default for ContentProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            min_words: 2500,
            tests_per_topic: 20,
            min_flashcards: 15,
            required_markers: all_markers(),
        }
    }
}
