//! Content generator over an OpenAI-compatible chat completion endpoint.

use crate::{
    ChatMessage, ChatRequest, ChatResponse, SYSTEM_PROMPT, body_prompt, extract_json,
    flashcards_prompt, strip_markdown_fence, tests_prompt,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use temario_core::{Flashcard, GeneratedBody, Question, SectionMarker};
use temario_error::{ConfigError, GenerationError, GenerationErrorKind, TemarioResult};
use temario_interface::ContentGenerator;
use temario_policy::GeneratorConfig;
use tracing::{debug, error, instrument, warn};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Either a bare array or an object wrapping it under a known key.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Questions { questions: Vec<T> },
    Flashcards { flashcards: Vec<T> },
}

impl<T> Listing<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Questions { questions } => questions,
            Listing::Flashcards { flashcards } => flashcards,
        }
    }
}

/// Chat completion client implementing [`ContentGenerator`].
///
/// Word counts are computed locally from the returned text.
#[derive(Debug, Clone)]
pub struct ChatCompletionGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    markers: Vec<SectionMarker>,
}

impl ChatCompletionGenerator {
    /// Build from configuration, reading the API key from the configured
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the variable is unset.
    #[instrument(skip_all, fields(model = %config.model))]
    pub fn from_config(config: &GeneratorConfig) -> TemarioResult<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|e| {
            ConfigError::new(format!("{} not set: {}", config.api_key_env, e))
        })?;
        Ok(Self::with_api_key(config, api_key))
    }

    /// Build from configuration with an explicit API key.
    pub fn with_api_key(config: &GeneratorConfig, api_key: impl Into<String>) -> Self {
        debug!(base_url = %config.base_url, "Creating chat completion generator");
        Self {
            client: Client::new(),
            endpoint: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                COMPLETIONS_PATH
            ),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
            markers: temario_core::ContentProfile::default()
                .required_markers()
                .clone(),
        }
    }

    /// Section headings requested in body prompts.
    pub fn with_markers(mut self, markers: Vec<SectionMarker>) -> Self {
        self.markers = markers;
        self
    }

    /// Model name sent with every request.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: String) -> Result<String, GenerationError> {
        let request = ChatRequest::builder()
            .model(self.model.clone())
            .messages(vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| {
                GenerationError::new(GenerationErrorKind::Request(format!(
                    "invalid request: {}",
                    e
                )))
            })?;

        let send = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send();
        let timeout_secs = self.timeout.as_secs();

        let response = match tokio::time::timeout(self.timeout, send).await {
            Err(_) => {
                return Err(GenerationError::new(GenerationErrorKind::Timeout(timeout_secs)));
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(GenerationError::new(GenerationErrorKind::Timeout(timeout_secs)));
            }
            Ok(Err(e)) => {
                error!(error = ?e, "Failed to send completion request");
                return Err(GenerationError::new(GenerationErrorKind::Request(
                    e.to_string(),
                )));
            }
            Ok(Ok(response)) => response,
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Completion endpoint returned error");
            return Err(GenerationError::new(GenerationErrorKind::Status {
                status_code: status.as_u16(),
                message: body,
            }));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::new(GenerationErrorKind::Deserialization(e.to_string()))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::EmptyResponse))?;
        if choice.finish_reason.as_deref() == Some("length") {
            warn!("Completion truncated at the token limit");
        }
        if choice.message.content.trim().is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::EmptyResponse));
        }
        debug!(response_len = choice.message.content.len(), "Completion received");
        Ok(choice.message.content)
    }

    async fn complete_listing<T: DeserializeOwned>(
        &self,
        prompt: String,
    ) -> Result<Vec<T>, GenerationError> {
        let response = self.complete(prompt).await?;
        let json = extract_json(&response)?;
        let listing: Listing<T> = serde_json::from_str(&json).map_err(|e| {
            GenerationError::new(GenerationErrorKind::Deserialization(format!(
                "{} in {} bytes of JSON",
                e,
                json.len()
            )))
        })?;
        Ok(listing.into_items())
    }
}

#[async_trait]
impl ContentGenerator for ChatCompletionGenerator {
    #[instrument(skip(self), fields(provider = "openai-compatible", model = %self.model))]
    async fn generate_body(
        &self,
        assistant_name: &str,
        topic_title: &str,
        min_words: usize,
    ) -> TemarioResult<GeneratedBody> {
        let prompt = body_prompt(assistant_name, topic_title, min_words, &self.markers);
        let response = self.complete(prompt).await?;
        let body = GeneratedBody::from_text(strip_markdown_fence(&response));
        debug!(word_count = body.word_count, "Generated body");
        Ok(body)
    }

    #[instrument(skip(self, text), fields(provider = "openai-compatible", text_len = text.len()))]
    async fn derive_tests(
        &self,
        topic_title: &str,
        text: &str,
        requested: usize,
    ) -> TemarioResult<Vec<Question>> {
        let questions: Vec<Question> = self
            .complete_listing(tests_prompt(topic_title, text, requested))
            .await?;
        debug!(count = questions.len(), "Derived questions");
        Ok(questions)
    }

    #[instrument(skip(self, text), fields(provider = "openai-compatible", text_len = text.len()))]
    async fn derive_flashcards(
        &self,
        topic_title: &str,
        text: &str,
        requested: usize,
    ) -> TemarioResult<Vec<Flashcard>> {
        let cards: Vec<Flashcard> = self
            .complete_listing(flashcards_prompt(topic_title, text, requested))
            .await?;
        debug!(count = cards.len(), "Derived flashcards");
        Ok(cards)
    }

    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }
}
