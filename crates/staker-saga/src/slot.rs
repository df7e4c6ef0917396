use std::sync::Arc;

use staker_store::StateStore;
use tracing::{debug, warn};

use crate::error::SagaError;
use crate::state::{STATE_KEY, WorkflowState};

/// Typed access to the single workflow slot in a [`StateStore`].
#[derive(Clone)]
pub struct StateSlot {
  store: Arc<dyn StateStore>,
  key: String,
}

impl StateSlot {
  pub fn new(store: Arc<dyn StateStore>) -> Self {
    Self::with_key(store, STATE_KEY)
  }

  pub fn with_key(store: Arc<dyn StateStore>, key: impl Into<String>) -> Self {
    Self {
      store,
      key: key.into(),
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub async fn load(&self) -> Result<Option<WorkflowState>, SagaError> {
    match self.store.get(&self.key).await? {
      Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
      None => Ok(None),
    }
  }

  pub async fn save(&self, state: &WorkflowState) -> Result<(), SagaError> {
    let raw = serde_json::to_string(state)?;
    self.store.put(&self.key, raw).await?;
    debug!(
      correlation_id = %state.correlation_id,
      phase = %state.kind(),
      error_count = state.error_count,
      "state_saved"
    );
    Ok(())
  }

  pub async fn clear(&self) -> Result<(), SagaError> {
    self.store.delete(&self.key).await?;
    debug!(key = %self.key, "state_cleared");
    Ok(())
  }

  /// Operator reset: empty the slot and hand back what was in it.
  ///
  /// A slot that no longer decodes is emptied as well, and reported as `None`.
  pub async fn take(&self) -> Result<Option<WorkflowState>, SagaError> {
    let state = match self.load().await {
      Ok(state) => state,
      Err(SagaError::Encoding(e)) => {
        warn!(key = %self.key, error = %e, "undecodable_state_discarded");
        None
      }
      Err(e) => return Err(e),
    };
    self.clear().await?;

    if let Some(state) = &state {
      warn!(
        correlation_id = %state.correlation_id,
        phase = %state.kind(),
        "workflow_cleared_by_operator"
      );
    }
    Ok(state)
  }
}
