//! # engram-consolidation
//!
//! The consolidation pipeline: a run coordinator holding the per-project
//! advisory lock, six ordered phases (scoring, clustering, pattern
//! extraction, conflict resolution, promotion, compression), extractive
//! summarization, and per-run quality metrics.
//!
//! Phase failures never abort a run; the failed phase is skipped, the
//! failure recorded, and the run finishes as `partial`.

pub mod algorithms;
pub mod engine;
pub mod metrics;
pub mod pipeline;
pub mod summarize;

pub use engine::ConsolidationEngine;
pub use summarize::ExtractiveSummarizer;
