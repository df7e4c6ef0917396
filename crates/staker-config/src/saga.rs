use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::poll::PollConfig;

/// Settings for the provisioning saga itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaConfig {
  /// Execution-layer address that receives withdrawals.
  pub withdrawal_address: String,
  /// Execution-layer address that receives priority fees.
  pub fee_recipient: String,
  /// Validator network operators that receive key shares.
  pub operator_ids: Vec<u64>,

  #[serde(default)]
  pub poll: PollConfig,

  /// Attributable failures tolerated before the attempt is abandoned.
  #[serde(default = "default_error_threshold")]
  pub error_threshold: u32,

  /// Trailing blocks scanned for conflicting deposits.
  #[serde(default = "default_front_run_window_blocks")]
  pub front_run_window_blocks: u64,

  /// Deposit size per validator, in wei.
  #[serde(default = "default_unit_stake", with = "staker_types::amount")]
  pub unit_stake: u128,

  /// Replaces the funding amount embedded in the service's registration call.
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    with = "staker_types::amount::option"
  )]
  pub registration_amount_override: Option<u128>,

  /// Correlation id to recover when local workflow state was lost.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recover_correlation_id: Option<String>,
}

impl SagaConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    check_address("saga.withdrawal_address", &self.withdrawal_address)?;
    check_address("saga.fee_recipient", &self.fee_recipient)?;

    if self.operator_ids.is_empty() {
      return Err(ConfigError::invalid("saga.operator_ids", "must not be empty"));
    }
    if self.error_threshold == 0 {
      return Err(ConfigError::invalid("saga.error_threshold", "must be at least 1"));
    }
    if self.poll.max_attempts == 0 {
      return Err(ConfigError::invalid("saga.poll.max_attempts", "must be at least 1"));
    }
    if self.unit_stake == 0 {
      return Err(ConfigError::invalid("saga.unit_stake", "must be non-zero"));
    }

    Ok(())
  }
}

fn check_address(field: &'static str, value: &str) -> Result<(), ConfigError> {
  let hex = value
    .strip_prefix("0x")
    .ok_or_else(|| ConfigError::invalid(field, "must start with 0x"))?;

  if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
    return Err(ConfigError::invalid(field, "must be 20 hex-encoded bytes"));
  }

  Ok(())
}

fn default_error_threshold() -> u32 {
  5
}

fn default_front_run_window_blocks() -> u64 {
  1000
}

fn default_unit_stake() -> u128 {
  staker_types::VALIDATOR_DEPOSIT
}
