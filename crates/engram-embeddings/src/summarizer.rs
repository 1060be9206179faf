//! HTTP LLM summarizer adapter for compression summaries.

use serde::{Deserialize, Serialize};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::ISummarizer;

#[derive(Debug, Clone)]
pub struct HttpSummarizerConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    model: &'a str,
    text: &'a str,
    target_tokens: usize,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
}

pub struct HttpSummarizer {
    config: HttpSummarizerConfig,
    client: reqwest::blocking::Client,
}

impl HttpSummarizer {
    pub fn new(config: HttpSummarizerConfig) -> EngramResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| EngramError::StoreUnavailable {
                reason: format!("summarizer client init: {e}"),
            })?;
        Ok(Self { config, client })
    }
}

impl ISummarizer for HttpSummarizer {
    fn summarize(&self, text: &str, target_tokens: usize) -> EngramResult<String> {
        let body = SummarizeRequest {
            model: &self.config.model,
            text,
            target_tokens,
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .map_err(|e| EngramError::Overloaded {
                reason: format!("summarizer unreachable: {e}"),
                retry_after_ms: 1_000,
            })?;

        if !response.status().is_success() {
            return Err(EngramError::Overloaded {
                reason: format!("summarizer returned {}", response.status()),
                retry_after_ms: 1_000,
            });
        }

        let parsed: SummarizeResponse =
            response.json().map_err(|e| EngramError::Overloaded {
                reason: format!("summarizer response malformed: {e}"),
                retry_after_ms: 1_000,
            })?;
        Ok(parsed.summary)
    }

    fn name(&self) -> &str {
        "http-summarizer"
    }

    fn is_available(&self) -> bool {
        true
    }
}
