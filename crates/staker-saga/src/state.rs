//! Persisted workflow state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staker_types::{CorrelationId, DepositDatum, TxRef, ValidatorBatch};

/// Store key of the single workflow slot.
pub const STATE_KEY: &str = "validator-provisioning/workflow-state";

/// Phase names in their fixed forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseKind {
  CreationIssued,
  CreationConfirmed,
  RegisterBroadcast,
  Registered,
  DepositDataGot,
  DepositBroadcast,
  DepositConfirmed,
}

impl fmt::Display for PhaseKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::CreationIssued => "CREATION_ISSUED",
      Self::CreationConfirmed => "CREATION_CONFIRMED",
      Self::RegisterBroadcast => "REGISTER_BROADCAST",
      Self::Registered => "REGISTERED",
      Self::DepositDataGot => "DEPOSIT_DATA_GOT",
      Self::DepositBroadcast => "DEPOSIT_BROADCAST",
      Self::DepositConfirmed => "DEPOSIT_CONFIRMED",
    };
    f.write_str(name)
  }
}

/// Phase together with the data known at that phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
  /// Creation requested; the service is generating keys.
  CreationIssued { requested: u32 },

  /// Keys and shares captured; registration not yet broadcast.
  CreationConfirmed {
    batch: ValidatorBatch,
    /// Registration call arguments exactly as the service returned them.
    registration: serde_json::Value,
  },

  RegisterBroadcast {
    batch: ValidatorBatch,
    registration: serde_json::Value,
    tx: TxRef,
  },

  /// Registered on the validator network; waiting for a staking run.
  Registered { batch: ValidatorBatch },

  DepositDataGot {
    batch: ValidatorBatch,
    deposits: Vec<DepositDatum>,
  },

  DepositBroadcast {
    batch: ValidatorBatch,
    deposits: Vec<DepositDatum>,
    tx: TxRef,
  },

  /// Terminal. Reaching it clears the slot, so it is never read back.
  DepositConfirmed { batch: ValidatorBatch },
}

impl Phase {
  pub fn kind(&self) -> PhaseKind {
    match self {
      Self::CreationIssued { .. } => PhaseKind::CreationIssued,
      Self::CreationConfirmed { .. } => PhaseKind::CreationConfirmed,
      Self::RegisterBroadcast { .. } => PhaseKind::RegisterBroadcast,
      Self::Registered { .. } => PhaseKind::Registered,
      Self::DepositDataGot { .. } => PhaseKind::DepositDataGot,
      Self::DepositBroadcast { .. } => PhaseKind::DepositBroadcast,
      Self::DepositConfirmed { .. } => PhaseKind::DepositConfirmed,
    }
  }

  /// The validator batch, once creation has been confirmed.
  pub fn batch(&self) -> Option<&ValidatorBatch> {
    match self {
      Self::CreationIssued { .. } => None,
      Self::CreationConfirmed { batch, .. }
      | Self::RegisterBroadcast { batch, .. }
      | Self::Registered { batch }
      | Self::DepositDataGot { batch, .. }
      | Self::DepositBroadcast { batch, .. }
      | Self::DepositConfirmed { batch } => Some(batch),
    }
  }
}

/// The single unit of persisted saga memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
  pub correlation_id: CorrelationId,
  pub phase: Phase,
  /// Attributable failures recorded against this attempt.
  pub error_count: u32,
  pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
  pub fn kind(&self) -> PhaseKind {
    self.phase.kind()
  }
}
