//! Topic records: one syllabus unit of an assistant.

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a persisted topic.
///
/// # Examples
///
/// ```
/// use temario_core::TopicStatus;
///
/// assert_eq!(TopicStatus::Published.to_string(), "published");
/// assert_eq!("error".parse::<TopicStatus>().unwrap(), TopicStatus::Error);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TopicStatus {
    /// No record yet
    #[default]
    Missing,
    /// Generation in flight
    Generating,
    /// Passed validation and persisted
    Published,
    /// Validation or persistence failed on the last attempt
    Error,
}

/// Persisted state of one topic.
///
/// `status == Published` guarantees `content` holds validated text. It says
/// nothing about `pdf_url`: the PDF is best-effort and its failures are kept
/// in the diagnostic flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into), default)]
pub struct TopicRecord {
    /// Stable identifier derived from the title
    pub slug: String,
    /// Human-readable title
    pub title: String,
    /// Display position within the syllabus
    pub order: u32,
    /// Lifecycle state
    pub status: TopicStatus,
    /// Bumped when a regeneration completes or a PDF repair succeeds
    pub version: u32,
    /// Length of `content` in words
    pub word_count: usize,
    /// Validated markdown body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Public URL of the rendered PDF
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    /// Last PDF attempt failed (render or upload)
    #[serde(default)]
    pub pdf_generation_failed: bool,
    /// PDF skipped because even the reduced render was too large
    #[serde(default)]
    pub pdf_too_large: bool,
    /// Message of the last PDF failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pdf_error: Option<String>,
    /// Message of the last stage failure when `status == Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Time of the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TopicRecord {
    /// Create a builder for a topic record.
    pub fn builder() -> TopicRecordBuilder {
        TopicRecordBuilder::default()
    }

    /// True when the topic carries publishable text.
    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Published on purpose without a PDF because the render was too large.
    pub fn is_content_only(&self) -> bool {
        self.status == TopicStatus::Published && self.pdf_too_large && self.pdf_url.is_none()
    }
}

/// Partial update of a topic record.
///
/// Unset fields are left untouched by a merge write. Double options clear a
/// field: `Some(None)` serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPatch {
    /// New lifecycle state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TopicStatus>,
    /// New version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// New word count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    /// Set or clear the PDF URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<Option<String>>,
    /// PDF failure flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_generation_failed: Option<bool>,
    /// PDF too-large flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_too_large: Option<bool>,
    /// Set or clear the last PDF error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pdf_error: Option<Option<String>>,
    /// Set or clear the last stage error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<Option<String>>,
    /// Write timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TopicPatch {
    /// Patch that marks the topic as failed with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(TopicStatus::Error),
            last_error: Some(Some(message.into())),
            ..Default::default()
        }
    }

    /// Patch that marks the topic as in flight and clears the last error.
    pub fn generating() -> Self {
        Self {
            status: Some(TopicStatus::Generating),
            last_error: Some(None),
            ..Default::default()
        }
    }

    /// Apply the patch to an in-memory record.
    pub fn apply_to(&self, record: &mut TopicRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(version) = self.version {
            record.version = version;
        }
        if let Some(word_count) = self.word_count {
            record.word_count = word_count;
        }
        if let Some(pdf_url) = &self.pdf_url {
            record.pdf_url = pdf_url.clone();
        }
        if let Some(flag) = self.pdf_generation_failed {
            record.pdf_generation_failed = flag;
        }
        if let Some(flag) = self.pdf_too_large {
            record.pdf_too_large = flag;
        }
        if let Some(message) = &self.last_pdf_error {
            record.last_pdf_error = message.clone();
        }
        if let Some(message) = &self.last_error {
            record.last_error = message.clone();
        }
        if let Some(at) = self.updated_at {
            record.updated_at = Some(at);
        }
    }
}

/// A topic selected for generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRequest {
    /// Title handed to the generator
    pub title: String,
    /// Display position
    pub order: u32,
}

impl TopicRequest {
    /// Build requests from plain titles, numbering them from 1 in list order.
    ///
    /// # Examples
    ///
    /// ```
    /// use temario_core::TopicRequest;
    ///
    /// let requests = TopicRequest::from_titles(["Tema 1", "Tema 2"]);
    /// assert_eq!(requests[1].order, 2);
    /// ```
    pub fn from_titles<I, S>(titles: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        titles
            .into_iter()
            .enumerate()
            .map(|(index, title)| Self {
                title: title.into(),
                order: index as u32 + 1,
            })
            .collect()
    }
}
