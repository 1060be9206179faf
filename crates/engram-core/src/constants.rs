//! System-wide constants. Anything configurable lives in `config` instead;
//! these are the fixed, bit-exact values of the engine.

/// Embedding dimensionality. Every vector in the index has exactly this
/// many components; mismatched vectors are rejected at the boundary.
pub const EMBEDDING_DIM: usize = 768;

/// Hard upper bound on working-memory capacity, regardless of config.
pub const WORKING_CAPACITY_HARD_CAP: usize = 9;

/// Default working-memory capacity (the 7 of 7±2).
pub const WORKING_CAPACITY_DEFAULT: usize = 7;

/// Activation floor below which a working item is evicted.
pub const WORKING_EVICTION_FLOOR: f64 = 0.05;

/// Multiplier applied to activation on every read access.
pub const ACCESS_REFRESH_FACTOR: f64 = 1.1;

/// Hebbian learning rate: strength ← s + RATE·(1 − s).
pub const HEBBIAN_RATE: f64 = 0.05;

/// Multiplicative decay applied to idle association links per decay tick.
pub const LINK_DECAY_FACTOR: f64 = 0.99;

/// Default spreading-activation propagation factor (α).
pub const SPREAD_ALPHA: f64 = 0.6;

/// Default spreading-activation cutoff (τ).
pub const SPREAD_CUTOFF: f64 = 0.05;

/// Default spreading-activation depth bound.
pub const SPREAD_DEPTH: usize = 2;

/// Default spreading-activation node budget.
pub const SPREAD_NODE_BUDGET: usize = 256;

/// Cosine similarity at or above which two memories are clustered together.
pub const CLUSTER_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Cosine similarity at or above which two memories are conflict candidates.
pub const CONFLICT_SIMILARITY_THRESHOLD: f64 = 0.90;

/// Minimum cluster size that produces a pattern.
pub const MIN_PATTERN_CLUSTER: usize = 3;

/// Safety bound when walking supersession chains.
pub const SUPERSESSION_CHAIN_LIMIT: usize = 64;
