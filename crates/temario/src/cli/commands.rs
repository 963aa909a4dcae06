//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Temario - syllabus topics, quizzes, flashcards and PDFs for exam-prep assistants
#[derive(Parser, Debug)]
#[command(name = "temario")]
#[command(about = "Generate and repair syllabus content for exam-preparation assistants", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (defaults to ./temario.toml when present)
    #[arg(long, global = true, env = "TEMARIO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and publish topics for an assistant
    Generate {
        /// Assistant id from the configuration
        #[arg(long)]
        assistant: String,

        /// Topic title, in syllabus order (repeatable)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// File with one topic title per line
        #[arg(long)]
        topics_file: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Verify every topic of an assistant and fix what is broken
    Repair {
        /// Assistant id from the configuration
        #[arg(long)]
        assistant: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show the stored state of every topic
    Status {
        /// Assistant id from the configuration
        #[arg(long)]
        assistant: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Delete a topic with its tests, flashcards and PDFs
    Purge {
        /// Assistant id from the configuration
        #[arg(long)]
        assistant: String,

        /// Topic slug
        #[arg(long)]
        slug: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
