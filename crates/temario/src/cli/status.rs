//! `temario status`: stored state of every topic.

use super::{commands::OutputFormat, print_json};
use temario::{Services, TemarioResult};

/// Print one row per stored topic.
pub async fn run_status(
    services: &Services,
    assistant_id: &str,
    format: OutputFormat,
) -> TemarioResult<()> {
    let assistant = services.assistant(assistant_id)?;
    let rows = services.status(&assistant.id).await?;

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Human => {
            println!(
                "{:>3}  {:<40} {:<10} {:>3} {:>6}  {}",
                "#", "slug", "status", "v", "words", "pdf"
            );
            println!("{:-<80}", "");
            for row in &rows {
                println!(
                    "{:>3}  {:<40} {:<10} {:>3} {:>6}  {}",
                    row.order, row.slug, row.status, row.version, row.word_count, row.pdf
                );
                if let Some(error) = &row.error {
                    println!("     ! {}", error);
                }
            }
            println!("{:-<80}", "");
            println!("Total: {} topics", rows.len());
        }
    }
    Ok(())
}
