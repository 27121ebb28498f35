//! Bounded exponential-wait backoff
//!
//! One stepping rule drives both uses: polling an asynchronous schema
//! change to completion and retrying a throttled request. The first step
//! waits the configured initial interval; every later step raises the
//! *previous wait* (in milliseconds) to the configured exponent. The
//! resulting schedule depends on the initial wait's absolute magnitude,
//! and callers tune against exactly this curve, so it must not be
//! replaced with a multiplicative one.
//!
//! The stepper performs no I/O. Callers own the loop, the sleep, and the
//! retried call.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff schedule parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Wait used by the first step, in milliseconds
    pub initial_wait_ms: u64,
    /// Exponent applied to the previous wait for each later step
    pub exponent: f64,
    /// Ceiling on the total time slept across one retry sequence
    pub max_total_wait_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_wait_ms: 1_000,
            exponent: 1.05,
            max_total_wait_ms: 15_000,
        }
    }
}

/// Progress through one retry sequence.
///
/// Start each independent sequence from [`BackoffState::new`]; stepping
/// past `Exceeded` restarts nothing, it just reports `Exceeded` again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffState {
    /// The wait the next step will use, in milliseconds
    wait_interval: f64,
    /// Total milliseconds slept so far
    total_waited: f64,
}

/// Outcome of one backoff step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Sleep `wait`, then continue the sequence with `state`
    Wait {
        /// State for the following step
        state: BackoffState,
        /// Duration the caller must sleep before retrying
        wait: Duration,
    },
    /// Projected total wait would pass the ceiling; fail permanently
    /// instead of sleeping again
    Exceeded,
}

impl BackoffState {
    /// Starts a fresh sequence: the first step will wait the configured
    /// initial interval
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            wait_interval: config.initial_wait_ms as f64,
            total_waited: 0.0,
        }
    }

    /// Advances the sequence by one step.
    ///
    /// Returns `Step::Exceeded` when sleeping the pending wait would push
    /// the total past the ceiling; the pending wait is never slept in
    /// that case.
    pub fn step(self, config: &BackoffConfig) -> Step {
        let projected = self.total_waited + self.wait_interval;
        if projected > config.max_total_wait_ms as f64 {
            return Step::Exceeded;
        }
        let wait = Duration::from_millis(self.wait_interval.round() as u64);
        Step::Wait {
            state: Self {
                wait_interval: self.wait_interval.powf(config.exponent),
                total_waited: projected,
            },
            wait,
        }
    }

    /// Total milliseconds slept so far in this sequence
    pub fn total_waited_ms(&self) -> u64 {
        self.total_waited.round() as u64
    }
}

/// Blocking-wait seam so tests can observe and skip real sleeps
pub trait Sleeper: Send + Sync {
    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `std::thread::sleep`
#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Why a retried operation ultimately failed
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// Last retryable error observed once the wait ceiling was exceeded
    Exhausted(E),
    /// Non-retryable error; surfaced immediately without sleeping
    Aborted(E),
}

impl<E> RetryError<E> {
    /// Unwraps the underlying error regardless of outcome class
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted(e) | RetryError::Aborted(e) => e,
        }
    }
}

/// Runs `operation`, retrying while `is_retryable` approves the error and
/// the backoff schedule permits another attempt.
///
/// The first attempt happens immediately; each retry sleeps the stepped
/// wait first. Total sleep never passes the configured ceiling.
pub fn run_with_backoff<T, E>(
    config: &BackoffConfig,
    sleeper: &dyn Sleeper,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: impl FnMut() -> Result<T, E>,
) -> Result<T, RetryError<E>> {
    let mut state = BackoffState::new(config);
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => return Err(RetryError::Aborted(error)),
            Err(error) => match state.step(config) {
                Step::Wait { state: next, wait } => {
                    sleeper.sleep(wait);
                    state = next;
                }
                Step::Exceeded => return Err(RetryError::Exhausted(error)),
            },
        }
    }
}

/// Test sleeper that records requested waits instead of blocking
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    /// Waits requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}
