//! Default values for every config section, in one place.

pub const CACHE_ENABLED: bool = true;
pub const CACHE_MAX_SIZE: u64 = 50_000;
pub const CACHE_DEFAULT_TTL_MS: u64 = 300_000;
pub const CACHE_WARMING_ENABLED: bool = false;

pub const QUERY_OPTIMIZATION_ENABLED: bool = true;
pub const HYBRID_VECTOR_WEIGHT: f64 = 0.6;

pub const BREAKER_FAILURE_THRESHOLD: f64 = 0.5;
pub const BREAKER_SUCCESS_THRESHOLD: u32 = 1;
pub const BREAKER_COOL_DOWN_MS: u64 = 60_000;
pub const BREAKER_MIN_VOLUME: u32 = 5;

pub const WORKING_CAPACITY: usize = 7;
pub const WORKING_DECAY_RATE: f64 = 0.1;
pub const WORKING_ADMISSION_THRESHOLD: f64 = 0.05;

pub const SALIENCE_NOVELTY_WEIGHT: f64 = 0.4;
pub const SALIENCE_SURPRISE_WEIGHT: f64 = 0.3;
pub const SALIENCE_CONTRADICTION_WEIGHT: f64 = 0.3;
pub const INHIBITION_RELEASE_THRESHOLD: f64 = 0.1;

pub const CONSOLIDATION_SCHEDULE_MS: u64 = 3_600_000;
pub const MIN_CLUSTER_SIZE: usize = 3;
pub const SIMILARITY_THRESHOLD: f64 = 0.75;
pub const TIME_WINDOW_MS: u64 = 3_600_000;

pub const RECONSOLIDATION_WINDOW_MS: u64 = 300_000;

pub const COMPRESSION_AGES_DAYS: [u32; 3] = [7, 30, 90];
pub const COMPRESSION_RATIO_TARGET: f64 = 0.3;
pub const COMPRESSION_FIDELITY_THRESHOLD: f64 = 0.7;

pub const AGENT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
pub const AGENT_STALE_THRESHOLD_MS: u64 = 60_000;
pub const AGENT_MAX_RETRIES: u32 = 3;

pub const QUOTA_MAX_MEMORIES: u64 = 1_000_000;
pub const QUOTA_MAX_EVENTS: u64 = 5_000_000;
pub const QUOTA_MAX_PROCEDURES: u64 = 100_000;
pub const QUOTA_MAX_ENTITIES: u64 = 500_000;
pub const QUOTA_MAX_STORAGE_BYTES: u64 = 10 * 1024 * 1024 * 1024;
