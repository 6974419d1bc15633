use crate::config::Config;
use crate::i18n::Language;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Body of `POST /translate`
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    texts: &'a [String],
    target: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<String>,
}

/// Every variant fails the whole batch; nothing is merged.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation service error ({status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse translation response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("translation service returned {actual} translations for {expected} texts")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Client for the storefront backend's batch translation endpoint.
#[derive(Debug, Clone)]
pub struct TranslationClient {
    http: reqwest::Client,
    api_url: String,
}

impl TranslationClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(http, api_url))
    }

    pub fn from_config(config: &Config) -> Result<Self, TranslateError> {
        Self::new(config.translate_api_url.clone(), config.request_timeout)
    }

    pub fn with_http_client(http: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
        }
    }

    /// Translate `texts` into `target` with a single request.
    ///
    /// The result has the same length and order as `texts`. No retries are
    /// attempted here; callers fall back to the source text on error.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        target: Language,
    ) -> Result<Vec<String>, TranslateError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = TranslateRequest {
            texts,
            target: target.code(),
        };

        let response = self.http.post(&self.api_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(TranslateError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let parsed: TranslateResponse =
            serde_json::from_slice(&bytes).map_err(TranslateError::Decode)?;

        if parsed.translations.len() != texts.len() {
            return Err(TranslateError::LengthMismatch {
                expected: texts.len(),
                actual: parsed.translations.len(),
            });
        }

        Ok(parsed.translations)
    }
}
