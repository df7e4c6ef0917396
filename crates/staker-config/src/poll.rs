use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Polling schedule for the provisioning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
  /// Wait after a create request before the first status poll.
  #[serde(default = "default_initial_delay_secs")]
  pub initial_delay_secs: u64,
  /// Wait between polls.
  #[serde(default = "default_interval_secs")]
  pub interval_secs: u64,
  /// Polls before giving up.
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
}

impl PollConfig {
  /// No waiting at all; for tests and dry runs.
  pub fn immediate(max_attempts: u32) -> Self {
    Self {
      initial_delay_secs: 0,
      interval_secs: 0,
      max_attempts,
    }
  }

  pub fn initial_delay(&self) -> Duration {
    Duration::from_secs(self.initial_delay_secs)
  }

  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs)
  }
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      initial_delay_secs: default_initial_delay_secs(),
      interval_secs: default_interval_secs(),
      max_attempts: default_max_attempts(),
    }
  }
}

fn default_initial_delay_secs() -> u64 {
  90
}

fn default_interval_secs() -> u64 {
  3
}

fn default_max_attempts() -> u32 {
  20
}
