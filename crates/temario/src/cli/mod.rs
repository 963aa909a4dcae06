//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the temario binary.

mod commands;
mod generate;
mod purge;
mod repair;
mod status;

pub use commands::{Cli, Commands};
pub use generate::run_generate;
pub use purge::run_purge;
pub use repair::run_repair;
pub use status::run_status;

use serde::Serialize;
use temario::{JsonError, TemarioResult};

/// Pretty JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> TemarioResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| JsonError::new(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
