pub mod embedding;
pub mod index;
pub mod storage;
pub mod summarizer;

pub use embedding::IEmbeddingProvider;
pub use index::IVectorIndex;
pub use storage::IMemoryStore;
pub use summarizer::ISummarizer;
