//! Consecutive-failure circuit breaker for service reads.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::ResilienceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures required to open the breaker.
    pub failure_threshold: u32,
    /// Cooldown period while the breaker remains open.
    pub open_cooldown: Duration,
}

impl From<&ResilienceConfig> for CircuitBreakerConfig {
    fn from(c: &ResilienceConfig) -> Self {
        Self {
            failure_threshold: c.failure_threshold,
            open_cooldown: Duration::from_secs(c.open_cooldown_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum Internal {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { probe_in_flight: bool },
}

/// Outcome of a guarded call
#[derive(Debug)]
pub enum CallError<E> {
    /// The breaker refused the call without running it
    Rejected,
    Failed(E),
}

pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    state: Mutex<Internal>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                open_cooldown: config.open_cooldown,
            },
            state: Mutex::new(Internal::Closed { consecutive_failures: 0 }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Internal> {
        // State is plain data; a poisoned lock still holds a usable value.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            Internal::Closed { .. } => CircuitState::Closed,
            Internal::Open { .. } => CircuitState::Open,
            Internal::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Admit one call. After the cooldown a single probe is let through.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now()).is_some()
    }

    fn try_acquire_at(&self, now: Instant) -> Option<Admission> {
        let mut state = self.lock();
        match *state {
            Internal::Closed { .. } => Some(Admission::Normal),
            Internal::Open { opened_at } if now.duration_since(opened_at) >= self.config.open_cooldown => {
                *state = Internal::HalfOpen { probe_in_flight: true };
                tracing::info!("Circuit '{}' half-open, probing", self.name);
                Some(Admission::Probe)
            }
            Internal::Open { .. } => None,
            Internal::HalfOpen { probe_in_flight: true } => None,
            Internal::HalfOpen { probe_in_flight: false } => {
                *state = Internal::HalfOpen { probe_in_flight: true };
                Some(Admission::Probe)
            }
        }
    }

    /// A probe that ended without an outcome reopens the breaker so a later call can probe again.
    fn abandon_probe(&self) {
        let mut state = self.lock();
        if matches!(*state, Internal::HalfOpen { probe_in_flight: true }) {
            tracing::warn!("Circuit '{}' probe abandoned, reopening", self.name);
            *state = Internal::Open { opened_at: Instant::now() };
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if matches!(*state, Internal::HalfOpen { .. }) {
            tracing::info!("Circuit '{}' closed", self.name);
        }
        *state = Internal::Closed { consecutive_failures: 0 };
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    fn record_failure_at(&self, now: Instant) {
        let mut state = self.lock();
        let next = match *state {
            Internal::Closed { consecutive_failures } => {
                let failures = consecutive_failures.saturating_add(1);
                if failures >= self.config.failure_threshold {
                    tracing::warn!("Circuit '{}' opened after {} consecutive failures", self.name, failures);
                    Internal::Open { opened_at: now }
                } else {
                    Internal::Closed { consecutive_failures: failures }
                }
            }
            Internal::HalfOpen { .. } => {
                tracing::warn!("Circuit '{}' probe failed, reopening", self.name);
                Internal::Open { opened_at: now }
            }
            open @ Internal::Open { .. } => open,
        };
        *state = next;
    }

    /// Run `fut` if admitted. Errors for which `counts` returns false (e.g. not found)
    /// are reported as successes of the downstream dependency.
    pub async fn call<T, E, F>(&self, counts: impl Fn(&E) -> bool, fut: F) -> Result<T, CallError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let Some(admission) = self.try_acquire_at(Instant::now()) else {
            return Err(CallError::Rejected);
        };
        let mut permit = Permit { breaker: self, admission: Some(admission) };
        let result = fut.await;
        permit.admission = None;

        match result {
            Ok(v) => {
                self.record_success();
                Ok(v)
            }
            Err(e) => {
                if counts(&e) {
                    self.record_failure();
                } else {
                    self.record_success();
                }
                Err(CallError::Failed(e))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

/// Held across a guarded call; dropping it before the call settles releases a half-open probe.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Option<Admission>,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.admission == Some(Admission::Probe) {
            self.breaker.abandon_probe();
        }
    }
}
