//! Saga runner with channel-based triggering.
//!
//! The `SagaRunner` owns an mpsc channel of [`Trigger`]s and runs one saga
//! invocation per trigger, strictly one at a time. Serial execution is what
//! keeps the single workflow slot free of concurrent writers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::SagaError;
use crate::events::SagaNotifier;
use crate::saga::{RegistrationOutcome, StakingOutcome, ValidatorProvisioningSaga};

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
  Register {
    max_validators: u32,
    operational_period_days: u32,
  },
  Stake,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
  Registration(RegistrationOutcome),
  Staking(StakingOutcome),
}

/// # Usage
///
/// ```ignore
/// let runner = SagaRunner::new(saga);
///
/// // Hand the sender to schedulers, operator endpoints, etc.
/// let sender = runner.sender();
///
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await;
/// ```
pub struct SagaRunner<N: SagaNotifier> {
  sender: mpsc::Sender<Trigger>,
  receiver: mpsc::Receiver<Trigger>,
  saga: Arc<ValidatorProvisioningSaga<N>>,
}

impl<N: SagaNotifier> SagaRunner<N> {
  pub fn new(saga: Arc<ValidatorProvisioningSaga<N>>) -> Self {
    Self::with_buffer_size(saga, 16)
  }

  pub fn with_buffer_size(saga: Arc<ValidatorProvisioningSaga<N>>, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self { sender, receiver, saga }
  }

  pub fn sender(&self) -> mpsc::Sender<Trigger> {
    self.sender.clone()
  }

  pub fn saga(&self) -> &ValidatorProvisioningSaga<N> {
    &self.saga
  }

  /// Run invocations until the token is cancelled or every sender is gone.
  ///
  /// An invocation in flight is allowed to finish; cancelling between steps
  /// would only move the resume point, never skip one.
  pub async fn start(mut self, cancel: CancellationToken) {
    // Drop our own sender so the loop ends once external senders are gone.
    drop(self.sender);
    info!("saga runner started");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("saga runner cancelled");
          break;
        }
        trigger = self.receiver.recv() => {
          let Some(trigger) = trigger else {
            info!("saga runner channel closed");
            break;
          };

          match Self::run(&self.saga, &trigger).await {
            Ok(outcome) => info!(trigger = ?trigger, outcome = ?outcome, "saga invocation completed"),
            Err(e) => error!(trigger = ?trigger, error = %e, "saga invocation failed"),
          }
        }
      }
    }
  }

  /// Run a single invocation directly, bypassing the channel.
  pub async fn execute_once(&self, trigger: Trigger) -> Result<TriggerOutcome, SagaError> {
    Self::run(&self.saga, &trigger).await
  }

  async fn run(saga: &ValidatorProvisioningSaga<N>, trigger: &Trigger) -> Result<TriggerOutcome, SagaError> {
    match *trigger {
      Trigger::Register {
        max_validators,
        operational_period_days,
      } => saga
        .run_registration(max_validators, operational_period_days)
        .await
        .map(TriggerOutcome::Registration),
      Trigger::Stake => saga.run_staking().await.map(TriggerOutcome::Staking),
    }
  }
}
