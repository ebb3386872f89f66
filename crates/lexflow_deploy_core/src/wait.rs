use std::time::Duration;

use crate::error::DeployError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn stack_default() -> Self {
        Self {
            max_wait: Duration::from_secs(30 * 60),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn function_update_default() -> Self {
        Self {
            max_wait: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(2),
        }
    }
}

pub enum PollOutcome<T> {
    Ready(T),
    Pending,
}

/// Polls until `poll` reports ready, sleeping `poll_interval` between attempts.
///
/// Elapsed time is counted in slept intervals so a no-op `sleep` keeps the
/// bound deterministic. The final sleep is shortened so the total never
/// exceeds `max_wait`.
pub fn poll_until<T>(
    target: &str,
    policy: &WaitPolicy,
    sleep: &dyn Fn(Duration),
    mut poll: impl FnMut() -> Result<PollOutcome<T>, DeployError>,
) -> Result<T, DeployError> {
    let mut waited = Duration::ZERO;
    loop {
        if let PollOutcome::Ready(value) = poll()? {
            return Ok(value);
        }
        if waited >= policy.max_wait {
            return Err(DeployError::Timeout {
                target: target.to_string(),
                waited_secs: waited.as_secs(),
            });
        }
        let interval = policy.poll_interval.min(policy.max_wait - waited);
        sleep(interval);
        waited += interval;
    }
}
