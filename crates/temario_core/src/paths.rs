//! Key layout shared by the document store and object storage.
//!
//! ```text
//! assistants/{assistant}/syllabus/{slug}            topic record
//! assistants/{assistant}/tests/{slug}/q-001         one question per document
//! assistants/{assistant}/flashcards/{slug}/c-001    one card per document
//! assistants/{assistant}/locks/generation           generation lease
//! assistants/{assistant}/syllabus/{slug}/v3.pdf     object storage key
//! ```

/// Collection holding every topic record of an assistant.
pub fn syllabus_collection(assistant_id: &str) -> String {
    format!("assistants/{}/syllabus", assistant_id)
}

/// Collection holding the questions of one topic.
pub fn tests_collection(assistant_id: &str, slug: &str) -> String {
    format!("assistants/{}/tests/{}", assistant_id, slug)
}

/// Collection holding the flashcards of one topic.
pub fn flashcards_collection(assistant_id: &str, slug: &str) -> String {
    format!("assistants/{}/flashcards/{}", assistant_id, slug)
}

/// Collection holding lease documents of an assistant.
pub fn locks_collection(assistant_id: &str) -> String {
    format!("assistants/{}/locks", assistant_id)
}

/// Document id of the n-th question (zero-based input, one-based id).
pub fn question_id(index: usize) -> String {
    format!("q-{:03}", index + 1)
}

/// Document id of the n-th flashcard (zero-based input, one-based id).
pub fn flashcard_id(index: usize) -> String {
    format!("c-{:03}", index + 1)
}

/// Object storage key of a rendered topic PDF.
///
/// # Examples
///
/// ```
/// use temario_core::pdf_object_key;
///
/// assert_eq!(
///     pdf_object_key("auxiliar-administrativo", "tema-1", 4),
///     "assistants/auxiliar-administrativo/syllabus/tema-1/v4.pdf"
/// );
/// ```
pub fn pdf_object_key(assistant_id: &str, slug: &str, version: u32) -> String {
    format!("assistants/{}/syllabus/{}/v{}.pdf", assistant_id, slug, version)
}
