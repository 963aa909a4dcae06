//! Layered TOML configuration.
//!
//! Sources, lowest precedence first:
//! - Bundled defaults (include_str! from temario.toml)
//! - `~/.config/temario/temario.toml`
//! - `./temario.toml`
//! - An explicit file passed by the operator
//! - `TEMARIO__SECTION__KEY` environment variables

use crate::RetryPolicy;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use temario_core::ContentProfile;
use temario_error::{ConfigError, TemarioResult};
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../temario.toml");

/// An assistant entry: the subject-specific tutor content is generated for.
///
/// ```toml
/// [assistants.auxiliar-administrativo]
/// name = "Auxiliar Administrativo del Estado"
/// profile = "oposiciones"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Display name handed to the generator
    pub name: String,
    /// Key into the `profiles` table
    #[serde(default = "default_profile_name")]
    pub profile: String,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// An assistant with its profile resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assistant {
    /// Identifier used in store paths
    pub id: String,
    /// Display name
    pub name: String,
    /// Thresholds its content must meet
    pub profile: ContentProfile,
}

/// Size thresholds of the PDF pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfPolicy {
    /// Renders above this size go through content reduction
    pub render_threshold_bytes: usize,
    /// Uploads above this size are rejected without an attempt
    pub upload_limit_bytes: usize,
    /// Hard cap applied to reduced content, in characters
    pub reduced_char_cap: usize,
}

impl Default for PdfPolicy {
    fn default() -> Self {
        Self {
            render_threshold_bytes: 2 * 1024 * 1024,
            upload_limit_bytes: 100 * 1024 * 1024,
            reduced_char_cap: 60_000,
        }
    }
}

/// Retry policies per network stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    /// PDF render calls
    #[serde(default = "RetryPolicy::render_default")]
    pub render: RetryPolicy,
    /// Object storage uploads
    #[serde(default = "RetryPolicy::upload_default")]
    pub upload: RetryPolicy,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            render: RetryPolicy::render_default(),
            upload: RetryPolicy::upload_default(),
        }
    }
}

/// URL reachability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbePolicy {
    /// Hard deadline of one HEAD request
    pub timeout_ms: u64,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl ProbePolicy {
    /// Deadline as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Repair sweep limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPolicy {
    /// Upper bound on the work done for one topic
    pub per_topic_timeout_secs: u64,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            per_topic_timeout_secs: 600,
        }
    }
}

impl SweepPolicy {
    /// Per-topic deadline as a duration.
    pub fn per_topic_timeout(&self) -> Duration {
        Duration::from_secs(self.per_topic_timeout_secs)
    }
}

/// Batch run state sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPolicy {
    /// Operator log lines kept in the run snapshot
    pub log_capacity: usize,
    /// Events buffered per subscriber before lagging ones skip ahead
    pub event_buffer: usize,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            log_capacity: 500,
            event_buffer: 256,
        }
    }
}

/// Optional per-assistant generation lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeasePolicy {
    /// Acquire the lease before generate and repair
    pub enabled: bool,
    /// Lease lifetime; an expired lease can be taken over
    pub ttl_secs: u64,
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: 3600,
        }
    }
}

impl LeasePolicy {
    /// Lease lifetime as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL without the `/v1/...` suffix
    pub base_url: String,
    /// Model name sent with every request
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Deadline of one completion request
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "TEMARIO_LLM_API_KEY".to_string(),
            timeout_secs: 300,
            temperature: 0.7,
            max_tokens: 16_000,
        }
    }
}

impl GeneratorConfig {
    /// Request deadline as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// PDF render endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Base URL; requests go to `{base_url}/api/syllabus/{assistant}/pdf`
    pub base_url: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Local backends for documents and objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the document store
    pub documents_path: PathBuf,
    /// Root directory of object storage
    pub objects_path: PathBuf,
    /// Public base URL objects are served from; `file://` URLs when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_path: PathBuf::from("./data/documents"),
            objects_path: PathBuf::from("./data/objects"),
            public_base_url: None,
        }
    }
}

/// Complete Temario configuration.
///
/// # Example
///
/// ```toml
/// [profiles.oposiciones]
/// name = "oposiciones"
/// min_words = 2800
/// tests_per_topic = 20
/// min_flashcards = 15
///
/// [assistants.auxiliar-administrativo]
/// name = "Auxiliar Administrativo del Estado"
/// profile = "oposiciones"
///
/// [pdf]
/// render_threshold_bytes = 2097152
/// upload_limit_bytes = 104857600
/// reduced_char_cap = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemarioConfig {
    /// Content profiles by name
    #[serde(default)]
    pub profiles: HashMap<String, ContentProfile>,
    /// Assistants by id
    #[serde(default)]
    pub assistants: HashMap<String, AssistantConfig>,
    /// PDF size thresholds
    #[serde(default)]
    pub pdf: PdfPolicy,
    /// Retry policies
    #[serde(default)]
    pub retry: RetrySection,
    /// URL probe
    #[serde(default)]
    pub probe: ProbePolicy,
    /// Repair sweep
    #[serde(default)]
    pub sweep: SweepPolicy,
    /// Batch run state
    #[serde(default)]
    pub run: RunPolicy,
    /// Generation lease
    #[serde(default)]
    pub lease: LeasePolicy,
    /// Content generator endpoint
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// PDF render endpoint
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Local storage backends
    #[serde(default)]
    pub storage: StorageConfig,
}

impl TemarioConfig {
    /// Load configuration with precedence: env > explicit file > ./temario.toml
    /// > ~/.config/temario/temario.toml > bundled defaults.
    #[instrument(name = "temario_config_load", skip_all, fields(explicit = explicit.is_some()))]
    pub fn load(explicit: Option<&Path>) -> TemarioResult<Self> {
        debug!("Loading configuration with precedence: env > explicit > cwd > home > defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("temario").join("temario.toml");
            debug!(path = %user_config.display(), "Checking user config");
            builder = builder.add_source(File::from(user_config).required(false));
        }

        builder = builder.add_source(File::with_name("temario").required(false));

        if let Some(path) = explicit {
            debug!(path = %path.display(), "Adding explicit config");
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TEMARIO")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(|e| {
            ConfigError::new(format!("Failed to build configuration: {}", e))
        })?;

        let parsed: Self = config.try_deserialize().map_err(|e| {
            ConfigError::new(format!("Failed to deserialize configuration: {}", e))
        })?;

        parsed.validate()?;
        debug!(
            profiles = parsed.profiles.len(),
            assistants = parsed.assistants.len(),
            "Configuration loaded"
        );
        Ok(parsed)
    }

    /// Load only from a specific file, ignoring the layered sources.
    #[instrument(name = "temario_config_from_file", skip_all, fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> TemarioResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a TOML document on its own.
    pub fn from_toml(content: &str) -> TemarioResult<Self> {
        let parsed: Self = toml_from_str(content)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Bundled defaults only.
    pub fn bundled() -> TemarioResult<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Resolve an assistant and its content profile.
    ///
    /// Unknown assistants fall back to the `default` profile and use their id
    /// as display name, so ad-hoc runs do not need a config entry.
    pub fn assistant(&self, id: &str) -> TemarioResult<Assistant> {
        let (name, profile_name) = match self.assistants.get(id) {
            Some(entry) => (entry.name.clone(), entry.profile.clone()),
            None => (id.to_string(), default_profile_name()),
        };
        let profile = self.profile(&profile_name)?;
        Ok(Assistant {
            id: id.to_string(),
            name,
            profile,
        })
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> TemarioResult<ContentProfile> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None if name == "default" => Ok(ContentProfile::default()),
            None => Err(ConfigError::new(format!("Unknown content profile '{}'", name)).into()),
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> TemarioResult<()> {
        for (id, assistant) in &self.assistants {
            if assistant.profile != "default" && !self.profiles.contains_key(&assistant.profile) {
                return Err(ConfigError::new(format!(
                    "Assistant '{}' references unknown profile '{}'",
                    id, assistant.profile
                ))
                .into());
            }
        }
        for (name, profile) in &self.profiles {
            if *profile.tests_per_topic() == 0 || *profile.min_words() == 0 {
                return Err(ConfigError::new(format!(
                    "Profile '{}' needs non-zero min_words and tests_per_topic",
                    name
                ))
                .into());
            }
        }
        if self.pdf.render_threshold_bytes == 0
            || self.pdf.upload_limit_bytes < self.pdf.render_threshold_bytes
        {
            return Err(ConfigError::new(
                "pdf.upload_limit_bytes must be at least pdf.render_threshold_bytes (> 0)",
            )
            .into());
        }
        for (stage, policy) in [("render", &self.retry.render), ("upload", &self.retry.upload)] {
            if policy.max_attempts == 0 {
                return Err(ConfigError::new(format!(
                    "retry.{}.max_attempts must be at least 1",
                    stage
                ))
                .into());
            }
        }
        Ok(())
    }
}

fn toml_from_str(content: &str) -> TemarioResult<TemarioConfig> {
    let config = Config::builder()
        .add_source(File::from_str(content, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::new(format!("Failed to parse TOML: {}", e)))?;
    Ok(config
        .try_deserialize()
        .map_err(|e| ConfigError::new(format!("Failed to deserialize configuration: {}", e)))?)
}
