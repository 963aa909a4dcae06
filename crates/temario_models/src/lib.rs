//! Network collaborators of the Temario pipeline.
//!
//! - [`ChatCompletionGenerator`]: writes syllabus bodies, questions and
//!   flashcards through an OpenAI-compatible chat completion endpoint.
//! - [`HttpPdfRenderer`]: turns markdown into a PDF through
//!   `POST /api/syllabus/{assistantId}/pdf`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chat;
mod dto;
mod extraction;
mod prompts;
mod render;

pub use chat::ChatCompletionGenerator;
pub use dto::{ChatChoice, ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, RenderResponse};
pub use extraction::{extract_json, strip_markdown_fence};
pub use prompts::{body_prompt, flashcards_prompt, tests_prompt, SYSTEM_PROMPT};
pub use render::HttpPdfRenderer;
