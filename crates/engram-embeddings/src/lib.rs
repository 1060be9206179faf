//! # engram-embeddings
//!
//! Stateless facades over the external embedding and LLM providers:
//! an HTTP adapter, a deterministic local fallback for offline and test
//! use, a content-hash cache, and a token-bucket rate limiter that
//! surfaces `Overloaded` when the queue is full.

pub mod cache;
pub mod hash_embedder;
pub mod http_provider;
pub mod rate_limit;
pub mod summarizer;

pub use cache::CachedEmbedder;
pub use hash_embedder::HashEmbedder;
pub use http_provider::{HttpEmbedder, HttpEmbedderConfig};
pub use rate_limit::{RateLimited, TokenBucket};
pub use summarizer::{HttpSummarizer, HttpSummarizerConfig};
