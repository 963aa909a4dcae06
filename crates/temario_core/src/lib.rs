//! Core data types for the Temario syllabus generation pipeline.
//!
//! Everything here is plain data: topic records and patches, questions and
//! flashcards, content profiles, and the key layout used by the stores.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assessment;
mod paths;
mod profile;
mod text;
mod topic;

pub use assessment::{Difficulty, Flashcard, OPTIONS_PER_QUESTION, Question, dedup_flashcards};
pub use paths::{
    flashcard_id, flashcards_collection, locks_collection, pdf_object_key, question_id,
    syllabus_collection, tests_collection,
};
pub use profile::{ContentProfile, ContentProfileBuilder, SectionMarker};
pub use text::{GeneratedBody, count_words, slugify};
pub use topic::{TopicPatch, TopicRecord, TopicRecordBuilder, TopicRequest, TopicStatus};
