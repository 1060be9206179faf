//! Per-operation deadlines. Every public operation accepts one; storage,
//! index, and adapter calls check it at each suspension point.

use std::time::{Duration, Instant};

use crate::errors::{EngramError, EngramResult};

/// A deadline for a single public operation.
///
/// `Deadline::none()` never expires. Checks are cheap (one `Instant::now()`),
/// so callers check at every I/O boundary.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { expires_at: None }
    }

    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + timeout),
        }
    }

    /// A deadline in milliseconds from now.
    pub fn after_ms(ms: u64) -> Self {
        Self::after(Duration::from_millis(ms))
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }

    /// Remaining time, if bounded. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|t| t.saturating_duration_since(Instant::now()))
    }

    /// Error out if expired. Called at every suspension point.
    pub fn check(&self, operation: &str) -> EngramResult<()> {
        if self.expired() {
            Err(EngramError::Timeout {
                operation: operation.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
