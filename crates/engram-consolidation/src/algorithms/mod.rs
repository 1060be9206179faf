//! Text algorithms shared by the pipeline phases: sentence splitting,
//! distinctive-term scoring, and graph-ranked extractive summarization.

pub mod key_terms;
pub mod sentences;
pub mod textrank;
