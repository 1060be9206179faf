use crate::errors::EngramResult;

/// Facade over the LLM provider for compression summaries.
pub trait ISummarizer: Send + Sync {
    /// Produce a summary of roughly `target_tokens` tokens.
    fn summarize(&self, text: &str, target_tokens: usize) -> EngramResult<String>;

    fn name(&self) -> &str;

    fn is_available(&self) -> bool;
}
