//! Bounded-retry connection management.
//!
//! Reconnect is an explicit attempt counter and a terminal failure value,
//! not a recursive retry: the caller holds a `LinkManager` and asks it to
//! `connect()` whenever the pipeline enters `Reconnecting`.

use std::time::Duration;

use voltlog_traits::Clock;

use crate::error::PipelineError;

/// Factory result for one connection attempt.
pub type ConnectResult<L> = Result<L, Box<dyn std::error::Error + Send + Sync>>;

pub struct LinkManager<L, F>
where
    F: FnMut() -> ConnectResult<L>,
{
    connect: F,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<L, F> LinkManager<L, F>
where
    F: FnMut() -> ConnectResult<L>,
{
    pub fn new(connect: F, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            connect,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Try up to the configured number of attempts, sleeping the fixed
    /// delay between failures. Exhaustion yields `LinkUnavailable`, which
    /// the pipeline treats as unrecoverable.
    pub fn connect<C: Clock>(&mut self, clock: &C) -> Result<L, PipelineError> {
        for attempt in 1..=self.max_attempts {
            match (self.connect)() {
                Ok(link) => {
                    tracing::info!(attempt, "link connected");
                    return Ok(link);
                }
                Err(e) => {
                    tracing::warn!(attempt, max = self.max_attempts, error = %e, "connect failed");
                    if attempt < self.max_attempts {
                        clock.sleep(self.retry_delay);
                    }
                }
            }
        }
        Err(PipelineError::LinkUnavailable {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltlog_traits::clock::test_clock::TestClock;

    fn failing_then_ok(failures: u32) -> impl FnMut() -> ConnectResult<u32> {
        let mut remaining = failures;
        move || {
            if remaining > 0 {
                remaining -= 1;
                Err(std::io::Error::other("port busy").into())
            } else {
                Ok(7)
            }
        }
    }

    #[test]
    fn succeeds_within_the_retry_budget() {
        let clock = TestClock::new();
        let mut mgr = LinkManager::new(failing_then_ok(3), 5, Duration::from_millis(500));
        assert_eq!(mgr.connect(&clock).unwrap(), 7);
        // Three failures, three sleeps of the fixed delay.
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn exhausting_the_budget_is_terminal() {
        let clock = TestClock::new();
        let mut mgr = LinkManager::new(failing_then_ok(5), 5, Duration::from_millis(500));
        match mgr.connect(&clock) {
            Err(PipelineError::LinkUnavailable { attempts }) => assert_eq!(attempts, 5),
            other => panic!("expected LinkUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn first_attempt_success_does_not_sleep() {
        let clock = TestClock::new();
        let mut mgr = LinkManager::new(failing_then_ok(0), 5, Duration::from_millis(500));
        assert_eq!(mgr.connect(&clock).unwrap(), 7);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }
}
