//! `temario purge`: remove one topic and everything derived from it.

use super::{commands::OutputFormat, print_json};
use temario::{Services, TemarioResult};

/// Delete the topic and print what went.
pub async fn run_purge(
    services: &Services,
    assistant_id: &str,
    slug: &str,
    format: OutputFormat,
) -> TemarioResult<()> {
    let assistant = services.assistant(assistant_id)?;
    let outcome = services.purge(&assistant.id, slug).await?;

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Human => {
            println!("Purged '{}' from '{}'", slug, assistant.id);
            println!("  Topic: {}", outcome.documents.topic_deleted);
            println!("  Tests: {}", outcome.documents.tests_deleted);
            println!("  Flashcards: {}", outcome.documents.flashcards_deleted);
            println!("  PDFs: {}", outcome.pdf_objects.len());
        }
    }
    Ok(())
}
