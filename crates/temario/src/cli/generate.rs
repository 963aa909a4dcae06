//! `temario generate`: batch generation with live progress.

use super::{commands::OutputFormat, print_json};
use std::path::Path;
use temario::{
    ConfigError, RunEvent, Services, TemarioResult, TopicOutcome, TopicRequest,
};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Generate every requested topic.
///
/// Failed topics are part of the printed summary, not an error.
pub async fn run_generate(
    services: &Services,
    assistant_id: &str,
    mut titles: Vec<String>,
    topics_file: Option<&Path>,
    format: OutputFormat,
) -> TemarioResult<()> {
    services.require_generator()?;
    let assistant = services.assistant(assistant_id)?;

    if let Some(path) = topics_file {
        titles.extend(read_titles(path).await?);
    }
    if titles.is_empty() {
        return Err(ConfigError::new("No topics given: use --topic or --topics-file").into());
    }

    let requests = TopicRequest::from_titles(titles);
    let orchestrator = services.orchestrator();
    let handle = orchestrator.handle_for(&requests);

    // First Ctrl-C finishes the topic in flight and skips the rest.
    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current topic");
            interrupt.cancel().await;
        }
    });

    let events = handle.subscribe();
    let (result, ()) = tokio::join!(
        orchestrator.run(&assistant, &requests, &handle),
        print_events(events, format)
    );
    let outcomes = result?;

    match format {
        OutputFormat::Json => print_json(&outcomes)?,
        OutputFormat::Human => print_outcomes(&outcomes),
    }
    Ok(())
}

/// Titles from a file: one per line, blank lines and `#` comments skipped.
async fn read_titles(path: &Path) -> TemarioResult<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        ConfigError::new(format!("Cannot read topics file {}: {}", path.display(), e))
    })?;
    Ok(parse_titles(&text))
}

fn parse_titles(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

async fn print_events(events: impl Stream<Item = RunEvent>, format: OutputFormat) {
    tokio::pin!(events);
    while let Some(event) = events.next().await {
        if format == OutputFormat::Human {
            match &event {
                RunEvent::TopicStarted { index, title } => {
                    eprintln!("[{}] {}", index + 1, title);
                }
                RunEvent::StageChanged { stage, .. } => eprintln!("    {}", stage),
                RunEvent::TopicFinished {
                    success: false,
                    error,
                    ..
                } => {
                    eprintln!("    failed: {}", error.as_deref().unwrap_or("unknown error"));
                }
                RunEvent::Progress {
                    completed,
                    total,
                    percent,
                } => eprintln!("    {}/{} ({}%)", completed, total, percent),
                _ => {}
            }
        }
        if matches!(event, RunEvent::Finished { .. }) {
            break;
        }
    }
}

fn print_outcomes(outcomes: &[TopicOutcome]) {
    println!("{:-<80}", "");
    for outcome in outcomes {
        println!("{:>3}  {}", outcome.order, outcome.summary());
    }
    println!("{:-<80}", "");
    let published = outcomes.iter().filter(|o| o.is_success()).count();
    println!(
        "Published {} of {} topics ({} failed)",
        published,
        outcomes.len(),
        outcomes.len() - published
    );
}
