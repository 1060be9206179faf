//! Per-strategy circuit breakers.
//!
//! Closed → Open when the failure ratio over a sliding window of at least
//! `min_volume` calls reaches the threshold. Open rejects in O(1) for the
//! cool-down, then Half-Open admits one probe; success closes, failure
//! reopens. Cancellations are not failures.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::info;

use engram_core::config::CircuitBreakerConfig;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::models::Strategy;

/// Sliding window size (call outcomes retained).
const WINDOW_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerInner {
    state: BreakerState,
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_successes: u32,
}

pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    config: CircuitBreakerConfig,
    strategy: Strategy,
}

impl CircuitBreaker {
    pub fn new(strategy: Strategy, config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(WINDOW_SIZE),
                opened_at: None,
                half_open_successes: 0,
            }),
            config,
            strategy,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker poisoned").state
    }

    /// Gate a call. Open breakers reject immediately with `CircuitOpen`;
    /// an elapsed cool-down transitions to Half-Open and admits the probe.
    pub fn admit(&self) -> EngramResult<()> {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                let cool_down = Duration::from_millis(self.config.cool_down_ms);
                if elapsed >= cool_down {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_successes = 0;
                    info!(strategy = %self.strategy, "breaker half-open, admitting probe");
                    Ok(())
                } else {
                    let remaining = cool_down - elapsed;
                    Err(EngramError::CircuitOpen {
                        strategy: self.strategy.to_string(),
                        retry_after_ms: remaining.as_millis() as u64,
                    })
                }
            }
        }
    }

    /// Record a call outcome. Cancellation/timeout must not be reported
    /// here; the router filters those out.
    pub fn record(&self, success: bool) {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        match inner.state {
            BreakerState::HalfOpen => {
                if success {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.success_threshold {
                        inner.state = BreakerState::Closed;
                        inner.window.clear();
                        inner.opened_at = None;
                        info!(strategy = %self.strategy, "breaker closed");
                    }
                } else {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    info!(strategy = %self.strategy, "breaker reopened after failed probe");
                }
            }
            BreakerState::Closed => {
                if inner.window.len() == WINDOW_SIZE {
                    inner.window.pop_front();
                }
                inner.window.push_back(success);

                let volume = inner.window.len() as u32;
                if volume >= self.config.min_volume {
                    let failures = inner.window.iter().filter(|ok| !**ok).count() as f64;
                    if failures / volume as f64 >= self.config.failure_threshold {
                        inner.state = BreakerState::Open;
                        inner.opened_at = Some(Instant::now());
                        info!(strategy = %self.strategy, "breaker opened");
                    }
                }
            }
            BreakerState::Open => {}
        }
    }
}

/// One breaker per strategy, created lazily.
pub struct BreakerRegistry {
    breakers: DashMap<Strategy, CircuitBreaker>,
    config: CircuitBreakerConfig,
}

impl BreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    pub fn admit(&self, strategy: Strategy) -> EngramResult<()> {
        self.breakers
            .entry(strategy)
            .or_insert_with(|| CircuitBreaker::new(strategy, self.config.clone()))
            .admit()
    }

    pub fn record(&self, strategy: Strategy, success: bool) {
        self.breakers
            .entry(strategy)
            .or_insert_with(|| CircuitBreaker::new(strategy, self.config.clone()))
            .record(success);
    }

    pub fn state(&self, strategy: Strategy) -> BreakerState {
        self.breakers
            .get(&strategy)
            .map(|b| b.state())
            .unwrap_or(BreakerState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 0.5,
            success_threshold: 1,
            cool_down_ms: 0,
            min_volume: 5,
        }
    }

    fn slow_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            cool_down_ms: 60_000,
            ..fast_config()
        }
    }

    #[test]
    fn breaker_opens_at_half_failures_over_min_volume() {
        let breaker = CircuitBreaker::new(Strategy::Vector, slow_config());
        for _ in 0..3 {
            breaker.record(false);
        }
        // Volume below min: still closed.
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record(true);
        breaker.record(false);
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn open_breaker_rejects_with_retry_hint() {
        let breaker = CircuitBreaker::new(Strategy::Vector, slow_config());
        for _ in 0..5 {
            breaker.record(false);
        }
        let err = breaker.admit().unwrap_err();
        assert_eq!(err.kind(), engram_core::errors::ErrorKind::CircuitOpen);
        assert!(err.retry_after_ms().is_some());
    }

    #[test]
    fn cool_down_elapse_admits_one_probe_and_success_closes() {
        let breaker = CircuitBreaker::new(Strategy::Keyword, fast_config());
        for _ in 0..5 {
            breaker.record(false);
        }
        assert_eq!(breaker.state(), BreakerState::Open);

        // cool_down_ms = 0: next admit flips to half-open.
        breaker.admit().unwrap();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record(true);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn failed_probe_reopens() {
        let breaker = CircuitBreaker::new(Strategy::Keyword, fast_config());
        for _ in 0..5 {
            breaker.record(false);
        }
        breaker.admit().unwrap();
        breaker.record(false);
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn mostly_successful_window_stays_closed() {
        let breaker = CircuitBreaker::new(Strategy::Hybrid, slow_config());
        for i in 0..20 {
            breaker.record(i % 4 != 0); // 25% failures
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn registry_isolates_strategies() {
        let registry = BreakerRegistry::new(slow_config());
        for _ in 0..5 {
            registry.record(Strategy::Vector, false);
        }
        assert_eq!(registry.state(Strategy::Vector), BreakerState::Open);
        assert_eq!(registry.state(Strategy::Keyword), BreakerState::Closed);
        assert!(registry.admit(Strategy::Keyword).is_ok());
    }
}
