//! Prompt templates.
//!
//! The body prompt lists the section headings the validator looks for; the
//! derivation prompts ask for bare JSON arrays with the field names of
//! [`temario_core::Question`] and [`temario_core::Flashcard`].

use temario_core::{OPTIONS_PER_QUESTION, SectionMarker};

/// System prompt shared by every request.
pub const SYSTEM_PROMPT: &str = "Eres un preparador experto de oposiciones en España. \
Redactas temarios rigurosos, actualizados y en español neutro, citando la normativa \
vigente cuando corresponde.";

/// Prompt for the long-form body of a topic.
pub fn body_prompt(
    assistant_name: &str,
    topic_title: &str,
    min_words: usize,
    markers: &[SectionMarker],
) -> String {
    let sections = markers
        .iter()
        .map(|marker| format!("- {}", marker.canonical_heading()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Redacta el tema \"{topic}\" del temario de \"{assistant}\".\n\n\
         Requisitos:\n\
         - Formato markdown.\n\
         - Extensión mínima: {min_words} palabras.\n\
         - Incluye exactamente estas secciones, con estos encabezados:\n{sections}\n\
         - Las secciones principales van numeradas (\"## 1. ...\", \"## 2. ...\").\n\
         - Devuelve solo el contenido del tema, sin comentarios adicionales.",
        topic = topic_title,
        assistant = assistant_name,
        min_words = min_words,
        sections = sections,
    )
}

/// Prompt for quiz questions derived from a body.
pub fn tests_prompt(topic_title: &str, text: &str, requested: usize) -> String {
    format!(
        "A partir del siguiente tema, genera {requested} preguntas tipo test sobre \"{topic}\".\n\n\
         Devuelve SOLO un array JSON válido. Cada elemento:\n\
         {{\"stem\": string, \"options\": [{options} strings], \"correct_index\": 0-{last}, \
         \"rationale\": string, \"difficulty\": \"easy\" | \"medium\" | \"hard\"}}\n\n\
         TEMA:\n{text}",
        requested = requested,
        topic = topic_title,
        options = OPTIONS_PER_QUESTION,
        last = OPTIONS_PER_QUESTION - 1,
        text = text,
    )
}

/// Prompt for flashcards derived from a body.
pub fn flashcards_prompt(topic_title: &str, text: &str, requested: usize) -> String {
    format!(
        "A partir del siguiente tema, genera {requested} flashcards distintas sobre \"{topic}\".\n\n\
         Devuelve SOLO un array JSON válido. Cada elemento:\n\
         {{\"front\": string, \"back\": string, \"tags\": [string]}}\n\
         No repitas la misma pregunta con otras palabras.\n\n\
         TEMA:\n{text}",
        requested = requested,
        topic = topic_title,
        text = text,
    )
}
