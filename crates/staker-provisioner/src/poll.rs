//! Bounded polling of not-yet-ready service endpoints.

use std::future::Future;
use std::time::Duration;

use staker_config::PollConfig;
use tracing::{debug, warn};

use crate::error::ProvisionerError;

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
  pub interval: Duration,
  pub max_attempts: u32,
}

impl From<&PollConfig> for PollPolicy {
  fn from(config: &PollConfig) -> Self {
    Self {
      interval: config.interval(),
      max_attempts: config.max_attempts,
    }
  }
}

/// Call `probe` until it yields a value, at most `policy.max_attempts` times.
///
/// `Ok(None)` means "not ready yet". Transient errors are logged and retried
/// on the same schedule; any other error is returned immediately. When the
/// budget runs out the result is [`ProvisionerError::Exhausted`], carrying the
/// last transient error if the final attempts failed.
pub async fn poll_until_ready<T, F, Fut>(
  operation: &'static str,
  policy: PollPolicy,
  mut probe: F,
) -> Result<T, ProvisionerError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<Option<T>, ProvisionerError>>,
{
  let mut last_error = None;

  for attempt in 1..=policy.max_attempts {
    match probe().await {
      Ok(Some(value)) => {
        debug!(operation, attempt, "poll_ready");
        return Ok(value);
      }
      Ok(None) => {
        debug!(operation, attempt, "poll_not_ready");
        last_error = None;
      }
      Err(e) if e.is_transient() => {
        warn!(operation, attempt, error = %e, "poll_transient_error");
        last_error = Some(Box::new(e));
      }
      Err(e) => return Err(e),
    }

    if attempt < policy.max_attempts {
      tokio::time::sleep(policy.interval).await;
    }
  }

  Err(ProvisionerError::Exhausted {
    operation,
    attempts: policy.max_attempts,
    last_error,
  })
}
