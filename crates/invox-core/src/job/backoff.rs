//! Exponential backoff policy and the generic poll-until-terminal
//! loop.
//!
//! The policy object is independent of any particular remote service;
//! the runner supplies a closure that performs one status query.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::models::JobConfig;

/// Backoff parameters: first interval, growth factor, per-wait cap,
/// and the hard ceiling on total elapsed time.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub cap: Duration,
    pub ceiling: Duration,
}

impl BackoffPolicy {
    pub fn from_config(cfg: &JobConfig) -> Self {
        Self {
            initial: Duration::from_millis(cfg.initial_interval_ms),
            multiplier: cfg.backoff_multiplier,
            cap: Duration::from_millis(cfg.max_interval_ms),
            ceiling: Duration::from_millis(cfg.timeout_ms),
        }
    }

    /// Wait before poll number `attempt + 2` (the first poll happens
    /// immediately): `initial * multiplier^attempt`, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = self.initial.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(ms as u64);
        delay.min(self.cap)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&JobConfig::default())
    }
}

/// Result of one poll attempt.
pub enum PollOutcome<T> {
    /// Not terminal yet; wait and poll again.
    Pending,
    /// Terminal; stop polling.
    Complete(T),
}

/// Failure of the polling loop.
#[derive(Debug)]
pub enum PollError<E> {
    /// The ceiling elapsed without a terminal outcome.
    DeadlineExceeded { elapsed: Duration },
    /// A poll attempt itself failed.
    Inner(E),
}

/// Poll `attempt` with sleep-based backoff until it reports a terminal
/// outcome or the policy's ceiling elapses.
pub async fn poll_until_terminal<T, E, F, Fut>(
    policy: &BackoffPolicy,
    mut attempt: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome<T>, E>>,
{
    let start = Instant::now();
    let mut polls: u32 = 0;

    loop {
        match attempt().await {
            Ok(PollOutcome::Complete(value)) => return Ok(value),
            Ok(PollOutcome::Pending) => {}
            Err(e) => return Err(PollError::Inner(e)),
        }

        let elapsed = start.elapsed();
        let remaining = policy.ceiling.saturating_sub(elapsed);
        if remaining.is_zero() {
            return Err(PollError::DeadlineExceeded { elapsed });
        }

        // Never sleep past the ceiling.
        let delay = policy.delay(polls).min(remaining);
        polls += 1;
        trace!(poll = polls, delay_ms = delay.as_millis() as u64, "job not terminal, backing off");
        tokio::time::sleep(delay).await;

        if start.elapsed() >= policy.ceiling {
            return Err(PollError::DeadlineExceeded {
                elapsed: start.elapsed(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(500),
            multiplier: 2.0,
            cap: Duration::from_secs(3),
            ceiling: Duration::from_secs(90),
        }
    }

    #[test]
    fn test_delay_sequence_grows_to_cap() {
        let p = policy();
        let delays: Vec<u64> = (0..6).map(|i| p.delay(i).as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 3000, 3000, 3000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_once_polls_exactly_twice() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let mut second_poll_at = None;

        let result: Result<u32, PollError<String>> = poll_until_terminal(&policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == 2 {
                second_poll_at = Some(started.elapsed());
            }
            async move {
                if n == 1 {
                    Ok(PollOutcome::Pending)
                } else {
                    Ok(PollOutcome::Complete(n))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Second poll happens no earlier than the initial interval
        assert!(second_poll_at.unwrap() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_terminal_hits_ceiling() {
        let p = BackoffPolicy {
            initial: Duration::from_millis(500),
            multiplier: 2.0,
            cap: Duration::from_secs(3),
            ceiling: Duration::from_secs(10),
        };
        let started = Instant::now();

        let result: Result<(), PollError<String>> =
            poll_until_terminal(&p, || async { Ok(PollOutcome::Pending) }).await;

        match result {
            Err(PollError::DeadlineExceeded { elapsed }) => {
                assert!(elapsed >= Duration::from_secs(10));
            }
            other => panic!("expected deadline, got {other:?}"),
        }
        // The loop never overshoots the ceiling by more than one wait
        assert!(started.elapsed() <= Duration::from_secs(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_propagates() {
        let result: Result<(), PollError<String>> = poll_until_terminal(&policy(), || async {
            Err("boom".to_string())
        })
        .await;

        match result {
            Err(PollError::Inner(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected inner error, got {other:?}"),
        }
    }
}
