// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible chat-completions endpoint,
//! implementing [`ReasoningBackend`].

use std::time::Duration;

use async_trait::async_trait;
use noctis_config::ReasoningConfig;
use noctis_core::NoctisError;
use noctis_core::traits::ReasoningBackend;
use noctis_core::types::{ConflictVerdict, DuplicateVerdict, ExtractionOutcome, ImportanceRating};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parse;
use crate::prompts;

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Reasoning client for structure extraction, importance rating, and
/// dedup/conflict verdicts.
///
/// Transient failures (429, 502, 503, 504, timeouts, connection errors)
/// retry with exponential backoff; everything else fails fast.
#[derive(Debug, Clone)]
pub struct ReasonClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
    base_delay: Duration,
}

impl ReasonClient {
    /// Build a client from config. Returns `None` when no base URL is
    /// configured: reasoning is optional, and without it extraction and the
    /// graph signal are simply disabled.
    pub fn from_config(config: &ReasoningConfig) -> Result<Option<Self>, NoctisError> {
        let Some(base_url) = &config.base_url else {
            return Ok(None);
        };

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| NoctisError::Config(format!("invalid API key header value: {e}")))?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NoctisError::Reasoning {
                message: format!("failed to build HTTP client: {e}"),
                transient: false,
            })?;

        Ok(Some(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }))
    }

    #[cfg(test)]
    pub fn test_client(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model: "test-model".into(),
            max_retries: 1,
            base_delay: Duration::from_millis(10),
        }
    }

    /// One prompt in, the assistant's text out, with retry on transient
    /// failures.
    async fn complete(&self, prompt: String) -> Result<String, NoctisError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt,
            }],
            temperature: 0.0,
            stream: false,
        };

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2_u32.saturating_pow(attempt - 1);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying reasoning request");
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(response) => response,
                Err(e) => {
                    // Timeouts and connection failures are worth retrying.
                    let transient = e.is_timeout() || e.is_connect();
                    let err = NoctisError::Reasoning {
                        message: format!("HTTP request failed: {e}"),
                        transient,
                    };
                    if transient && attempt < self.max_retries {
                        warn!(error = %err, "transient transport error, will retry");
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "reasoning response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| NoctisError::Reasoning {
                    message: format!("failed to read response body: {e}"),
                    transient: false,
                })?;
                let parsed: ChatResponse =
                    serde_json::from_str(&body).map_err(|e| NoctisError::Reasoning {
                        message: format!("failed to parse chat response: {e}"),
                        transient: false,
                    })?;
                return parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| NoctisError::Reasoning {
                        message: "chat response had no choices".into(),
                        transient: false,
                    });
            }

            if is_transient_status(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(NoctisError::Reasoning {
                    message: format!("reasoning API returned {status}: {body}"),
                    transient: true,
                });
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(NoctisError::Reasoning {
                message: format!("reasoning API returned {status}: {body}"),
                transient: is_transient_status(status),
            });
        }

        Err(last_error.unwrap_or_else(|| NoctisError::Reasoning {
            message: "reasoning request failed after retries".into(),
            transient: true,
        }))
    }
}

#[async_trait]
impl ReasoningBackend for ReasonClient {
    async fn extract(&self, text: &str) -> Result<ExtractionOutcome, NoctisError> {
        let response = self.complete(prompts::extraction_prompt(text)).await?;
        parse::parse_extraction(&response)
    }

    async fn rate_importance(&self, text: &str) -> Result<ImportanceRating, NoctisError> {
        let response = self.complete(prompts::importance_prompt(text)).await?;
        parse::parse_importance(&response)
    }

    async fn judge_duplicate(&self, a: &str, b: &str) -> Result<DuplicateVerdict, NoctisError> {
        let response = self.complete(prompts::duplicate_prompt(a, b)).await?;
        Ok(parse::parse_duplicate_verdict(&response))
    }

    async fn resolve_conflict(&self, a: &str, b: &str) -> Result<ConflictVerdict, NoctisError> {
        let response = self.complete(prompts::conflict_prompt(a, b)).await?;
        Ok(parse::parse_conflict_verdict(&response))
    }
}

fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503 | 504)
}
