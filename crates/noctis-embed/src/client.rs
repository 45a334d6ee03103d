// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible embeddings endpoint.
//!
//! Works against Ollama, vLLM, llama.cpp server, or the hosted OpenAI API;
//! anything that speaks `POST /v1/embeddings`.

use std::time::Duration;

use async_trait::async_trait;
use noctis_config::EmbeddingConfig;
use noctis_core::NoctisError;
use noctis_core::traits::EmbeddingBackend;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, EmbeddingRequest, EmbeddingResponse};

/// Embeddings client implementing [`EmbeddingBackend`].
///
/// Retries transient HTTP errors (429, 500, 502, 503, 504) with a short
/// fixed delay before giving up.
#[derive(Debug, Clone)]
pub struct EmbedClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

impl EmbedClient {
    pub fn new(config: &EmbeddingConfig, dimensions: usize) -> Result<Self, NoctisError> {
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
            .map_err(|e| NoctisError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions,
            max_retries: 2,
        })
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, NoctisError> {
        let expected = input.len();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input,
        };
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying embeddings request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await
                .map_err(|e| NoctisError::Embedding {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, batch = expected, "embeddings response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| NoctisError::Embedding {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let parsed: EmbeddingResponse =
                    serde_json::from_str(&body).map_err(|e| NoctisError::Embedding {
                        message: format!("failed to parse embeddings response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return self.validate(parsed, expected);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(NoctisError::Embedding {
                    message: format!("embeddings API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!(
                    "embeddings API error ({}): {}",
                    api_err.error.type_, api_err.error.message
                )
            } else {
                format!("embeddings API returned {status}: {body}")
            };
            return Err(NoctisError::Embedding {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| NoctisError::Embedding {
            message: "embeddings request failed after retries".into(),
            source: None,
        }))
    }

    /// Reorder by index and check the count and dimensionality the store
    /// will assume downstream.
    fn validate(
        &self,
        mut parsed: EmbeddingResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, NoctisError> {
        if parsed.data.len() != expected {
            return Err(NoctisError::Embedding {
                message: format!(
                    "expected {expected} embeddings, got {}",
                    parsed.data.len()
                ),
                source: None,
            });
        }
        parsed.data.sort_by_key(|d| d.index);
        for datum in &parsed.data {
            if datum.embedding.len() != self.dimensions {
                return Err(NoctisError::Embedding {
                    message: format!(
                        "embedding has {} dimensions, expected {}",
                        datum.embedding.len(),
                        self.dimensions
                    ),
                    source: None,
                });
            }
        }
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for EmbedClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, NoctisError> {
        let mut embeddings = self.request(vec![text.to_string()]).await?;
        embeddings.pop().ok_or_else(|| NoctisError::Embedding {
            message: "empty embeddings response".into(),
            source: None,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NoctisError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// True for HTTP status codes worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: "http://unused.invalid/v1".into(),
            api_key: Some("test-key".into()),
            model: "nomic-embed-text".into(),
            timeout_secs: 5,
        }
    }

    fn test_client(server: &MockServer) -> EmbedClient {
        EmbedClient::new(&test_config(), 3)
            .unwrap()
            .with_endpoint(format!("{}/embeddings", server.uri()))
    }

    fn embeddings_body(vectors: &[(usize, [f32; 3])]) -> serde_json::Value {
        serde_json::json!({
            "data": vectors
                .iter()
                .map(|(i, v)| serde_json::json!({"index": i, "embedding": v}))
                .collect::<Vec<_>>(),
            "model": "nomic-embed-text"
        })
    }

    #[tokio::test]
    async fn embed_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(
                serde_json::json!({"model": "nomic-embed-text", "input": ["hello"]}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(embeddings_body(&[(0, [0.1, 0.2, 0.3])])),
            )
            .mount(&server)
            .await;

        let embedding = test_client(&server).embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn batch_results_are_reordered_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_body(&[
                (1, [0.0, 1.0, 0.0]),
                (0, [1.0, 0.0, 0.0]),
            ])))
            .mount(&server)
            .await;

        let embeddings = test_client(&server)
            .embed_batch(&["first".into(), "second".into()])
            .await
            .unwrap();
        assert_eq!(embeddings[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(embeddings[1], vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [0.1, 0.2]}],
                "model": "nomic-embed-text"
            })))
            .mount(&server)
            .await;

        let err = test_client(&server).embed("short").await.unwrap_err();
        assert!(err.to_string().contains("dimensions"), "got: {err}");
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(embeddings_body(&[(0, [0.5, 0.5, 0.0])])),
            )
            .mount(&server)
            .await;

        let embedding = test_client(&server).embed("retry me").await.unwrap();
        assert_eq!(embedding, vec![0.5, 0.5, 0.0]);
    }

    #[tokio::test]
    async fn fails_fast_on_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "unknown model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server).embed("bad").await.unwrap_err();
        assert!(err.to_string().contains("invalid_request_error"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let server = MockServer::start().await;
        let embeddings = test_client(&server).embed_batch(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
