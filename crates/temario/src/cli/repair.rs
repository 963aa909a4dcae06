//! `temario repair`: one sweep over every topic of an assistant.

use super::{commands::OutputFormat, print_json};
use serde::Serialize;
use temario::{RepairResult, RepairSummary, Services, TemarioResult};

#[derive(Serialize)]
struct RepairReport<'a> {
    summary: &'a RepairSummary,
    results: &'a [RepairResult],
}

/// Run the sweep and print its report.
pub async fn run_repair(
    services: &Services,
    assistant_id: &str,
    format: OutputFormat,
) -> TemarioResult<()> {
    let assistant = services.assistant(assistant_id)?;
    let results = services.sweeper().repair_all(&assistant).await?;
    let summary = RepairSummary::from_results(&results);

    match format {
        OutputFormat::Json => print_json(&RepairReport {
            summary: &summary,
            results: &results,
        })?,
        OutputFormat::Human => {
            println!("Repair of '{}':", assistant.name);
            println!("{:-<80}", "");
            for result in &results {
                match &result.error {
                    Some(error) => println!("{:<16} {}: {}", result.action, result.slug, error),
                    None => println!("{:<16} {}", result.action, result.slug),
                }
            }
            println!("{:-<80}", "");
            let counts: Vec<String> = summary
                .by_action
                .iter()
                .map(|(action, count)| format!("{} {}", count, action))
                .collect();
            println!("Total: {} topics ({})", summary.total, counts.join(", "));
        }
    }
    Ok(())
}
