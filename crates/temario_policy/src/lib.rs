//! Configuration and retry policy for the Temario pipeline.
//!
//! [`TemarioConfig`] layers the bundled `temario.toml` with user overrides.
//! [`retry_with_backoff`] is the one retry loop shared by the render and
//! upload stages.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod retry;

pub use config::{
    Assistant, AssistantConfig, GeneratorConfig, LeasePolicy, PdfPolicy, ProbePolicy,
    RendererConfig, RetrySection, RunPolicy, StorageConfig, SweepPolicy, TemarioConfig,
};
pub use retry::{Backoff, RetryPolicy, retry_with_backoff};
