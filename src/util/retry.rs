use std::time::Duration;

use futures_retry::{ErrorHandler, RetryPolicy};
use tracing::{error, warn};

use crate::interface::checkpoint::CheckpointError;

/// Retry policy for the checkpoint loop: a fixed attempt budget with a fixed
/// delay between attempts, differentiated by the failure category the
/// checkpointer reported.
pub(crate) struct CheckpointRetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl CheckpointRetryPolicy {
    pub(crate) fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl ErrorHandler<CheckpointError> for CheckpointRetryPolicy {
    type OutError = CheckpointError;

    fn handle(&mut self, attempt: usize, e: CheckpointError) -> RetryPolicy<CheckpointError> {
        match e {
            // Lease lost. No amount of retrying will get it back.
            CheckpointError::Shutdown => RetryPolicy::ForwardError(e),
            _ if attempt >= self.max_attempts => RetryPolicy::ForwardError(e),
            CheckpointError::Throttling => {
                warn!(
                    delay_seconds = self.delay.as_secs(),
                    "was throttled while checkpointing, will attempt again"
                );
                RetryPolicy::WaitRetry(self.delay)
            }
            CheckpointError::InvalidState => {
                error!("daemon reported an invalid state while checkpointing");
                RetryPolicy::WaitRetry(self.delay)
            }
            CheckpointError::Other(ref msg) => {
                error!(error = %msg, "error while checkpointing");
                RetryPolicy::WaitRetry(self.delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CheckpointRetryPolicy {
        CheckpointRetryPolicy::new(3, Duration::from_secs(5))
    }

    #[test]
    fn shutdown_aborts_on_first_attempt() {
        let decision = policy().handle(1, CheckpointError::Shutdown);
        assert!(matches!(
            decision,
            RetryPolicy::ForwardError(CheckpointError::Shutdown)
        ));
    }

    #[test]
    fn retryable_categories_wait_below_the_budget() {
        for e in [
            CheckpointError::Throttling,
            CheckpointError::InvalidState,
            CheckpointError::Other("oops".to_owned()),
        ] {
            let decision = policy().handle(2, e);
            assert!(matches!(
                decision,
                RetryPolicy::WaitRetry(d) if d == Duration::from_secs(5)
            ));
        }
    }

    #[test]
    fn budget_exhaustion_forwards_the_error() {
        let decision = policy().handle(3, CheckpointError::Throttling);
        assert!(matches!(
            decision,
            RetryPolicy::ForwardError(CheckpointError::Throttling)
        ));
    }
}
