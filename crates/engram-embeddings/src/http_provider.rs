//! HTTP embedding adapter. The provider itself is an external collaborator;
//! only the request/response contract lives here.

use serde::{Deserialize, Serialize};
use tracing::warn;

use engram_core::constants::EMBEDDING_DIM;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::IEmbeddingProvider;

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Blocking HTTP client for a local or remote embedding service.
pub struct HttpEmbedder {
    config: HttpEmbedderConfig,
    client: reqwest::blocking::Client,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> EngramResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| EngramError::StoreUnavailable {
                reason: format!("embedding client init: {e}"),
            })?;
        Ok(Self { config, client })
    }

    fn request(&self, texts: Vec<&str>) -> EngramResult<Vec<Vec<f32>>> {
        let body = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .map_err(|e| EngramError::Overloaded {
                reason: format!("embedding provider unreachable: {e}"),
                retry_after_ms: 1_000,
            })?;

        if !response.status().is_success() {
            return Err(EngramError::Overloaded {
                reason: format!("embedding provider returned {}", response.status()),
                retry_after_ms: 1_000,
            });
        }

        let parsed: EmbedResponse = response.json().map_err(|e| EngramError::Overloaded {
            reason: format!("embedding response malformed: {e}"),
            retry_after_ms: 1_000,
        })?;

        for embedding in &parsed.embeddings {
            if embedding.len() != EMBEDDING_DIM {
                warn!(
                    got = embedding.len(),
                    expected = EMBEDDING_DIM,
                    "provider returned wrong dimensionality"
                );
                return Err(EngramError::InvalidArgument {
                    argument: "embedding".into(),
                    reason: format!(
                        "provider dimension {} != {}",
                        embedding.len(),
                        EMBEDDING_DIM
                    ),
                });
            }
        }
        Ok(parsed.embeddings)
    }
}

impl IEmbeddingProvider for HttpEmbedder {
    fn embed(&self, text: &str) -> EngramResult<Vec<f32>> {
        let mut results = self.request(vec![text])?;
        results.pop().ok_or_else(|| EngramError::Overloaded {
            reason: "embedding provider returned no vectors".into(),
            retry_after_ms: 1_000,
        })
    }

    fn embed_batch(&self, texts: &[String]) -> EngramResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.request(texts.iter().map(String::as_str).collect())
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &str {
        "http-embedder"
    }

    fn is_available(&self) -> bool {
        true
    }
}
