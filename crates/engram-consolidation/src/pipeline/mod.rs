//! The six ordered phases.
//!
//! Phase 1: Scoring → Phase 2: Clustering → Phase 3: Pattern extraction →
//! Phase 4: Conflict resolution → Phase 5: Promotion → Phase 6: Compression.
//!
//! Phases are pure where possible; the engine owns persistence and failure
//! containment.

pub mod phase1_scoring;
pub mod phase2_clustering;
pub mod phase3_patterns;
pub mod phase4_conflicts;
pub mod phase5_promotion;
pub mod phase6_compression;
