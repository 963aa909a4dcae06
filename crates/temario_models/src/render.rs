//! Client of the PDF render endpoint.

use crate::RenderResponse;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use temario_error::{RenderError, RenderErrorKind, TemarioResult};
use temario_interface::{PdfRenderer, RenderRequest};
use tracing::{debug, error, instrument};

/// `POST {base_url}/api/syllabus/{assistantId}/pdf`.
///
/// Non-2xx and `ok: false` are render failures. Deadlines are enforced by
/// the caller's retry loop.
#[derive(Debug, Clone)]
pub struct HttpPdfRenderer {
    client: Client,
    base_url: String,
}

impl HttpPdfRenderer {
    /// Create a renderer for the endpoint at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a renderer sharing an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Endpoint URL for an assistant.
    pub fn endpoint(&self, assistant_id: &str) -> String {
        format!("{}/api/syllabus/{}/pdf", self.base_url, assistant_id)
    }
}

/// Decode the body of a 2xx render response.
pub(crate) fn decode_render_response(response: RenderResponse) -> Result<Vec<u8>, RenderError> {
    if !response.ok {
        let reason = response.error.unwrap_or_else(|| "ok=false".to_string());
        return Err(RenderError::new(RenderErrorKind::Rejected(reason)));
    }
    let encoded = response.pdf_data.ok_or_else(|| {
        RenderError::new(RenderErrorKind::InvalidPayload("pdfData missing".to_string()))
    })?;
    let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
        RenderError::new(RenderErrorKind::InvalidPayload(format!(
            "pdfData is not base64: {}",
            e
        )))
    })?;
    if bytes.is_empty() {
        return Err(RenderError::new(RenderErrorKind::InvalidPayload(
            "pdfData is empty".to_string(),
        )));
    }
    Ok(bytes)
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    #[instrument(skip(self, request), fields(
        title = %request.title,
        markdown_len = request.content_markdown.len(),
        compression = ?request.compression,
    ))]
    async fn render(&self, assistant_id: &str, request: &RenderRequest) -> TemarioResult<Vec<u8>> {
        let response = self
            .client
            .post(self.endpoint(assistant_id))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to send render request");
                RenderError::new(RenderErrorKind::Request(e.to_string()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Render endpoint returned error");
            return Err(RenderError::new(RenderErrorKind::Status {
                status_code: status.as_u16(),
                message: body,
            })
            .into());
        }

        let parsed: RenderResponse = response.json().await.map_err(|e| {
            RenderError::new(RenderErrorKind::InvalidPayload(format!(
                "unreadable response: {}",
                e
            )))
        })?;
        let bytes = decode_render_response(parsed)?;
        debug!(size = bytes.len(), "Rendered PDF");
        Ok(bytes)
    }
}
