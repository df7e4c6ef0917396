//! Failure accounting against the persisted attempt.

use std::fmt;

use staker_types::CorrelationId;
use tracing::{error, warn};

use crate::error::SagaError;
use crate::slot::StateSlot;

pub const DEFAULT_ERROR_THRESHOLD: u32 = 5;

/// What [`ErrorAccountant::record_failure`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureRecord {
  /// The count was incremented and saved.
  Recorded { error_count: u32 },
  /// The count reached the threshold and the slot was cleared.
  Abandoned { error_count: u32 },
  /// There was nothing to charge the failure to.
  NoState,
  /// The slot belongs to a different attempt; left untouched.
  Mismatch { current: CorrelationId },
}

/// Counts failures per attempt and abandons an attempt at the threshold.
pub struct ErrorAccountant {
  slot: StateSlot,
  threshold: u32,
}

impl ErrorAccountant {
  pub fn new(slot: StateSlot, threshold: u32) -> Self {
    Self {
      slot,
      threshold: threshold.max(1),
    }
  }

  pub fn threshold(&self) -> u32 {
    self.threshold
  }

  pub async fn record_failure(
    &self,
    correlation_id: &CorrelationId,
    failure: &dyn fmt::Display,
  ) -> Result<FailureRecord, SagaError> {
    let Some(mut state) = self.slot.load().await? else {
      warn!(correlation_id = %correlation_id, error = %failure, "failure_without_state");
      return Ok(FailureRecord::NoState);
    };

    if &state.correlation_id != correlation_id {
      warn!(
        correlation_id = %correlation_id,
        current = %state.correlation_id,
        error = %failure,
        "failure_for_other_workflow"
      );
      return Ok(FailureRecord::Mismatch {
        current: state.correlation_id,
      });
    }

    state.error_count = state.error_count.saturating_add(1);
    error!(
      correlation_id = %correlation_id,
      phase = %state.kind(),
      error_count = state.error_count,
      threshold = self.threshold,
      error = %failure,
      "workflow_failure_recorded"
    );

    if state.error_count >= self.threshold {
      self.slot.clear().await?;
      error!(
        correlation_id = %correlation_id,
        phase = %state.kind(),
        error_count = state.error_count,
        "workflow_abandoned"
      );
      return Ok(FailureRecord::Abandoned {
        error_count: state.error_count,
      });
    }

    self.slot.save(&state).await?;
    Ok(FailureRecord::Recorded {
      error_count: state.error_count,
    })
  }

  /// Whether the stored attempt has already reached the threshold.
  pub async fn threshold_exceeded(&self) -> Result<bool, SagaError> {
    Ok(
      self
        .slot
        .load()
        .await?
        .is_some_and(|state| state.error_count >= self.threshold),
    )
  }
}
