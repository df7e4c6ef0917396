//! The validator provisioning saga.
//!
//! Each public entry point is one invocation: it loads the persisted
//! [`WorkflowState`], performs as many forward steps as it can, persists after
//! every step, and returns an outcome. A crash at any point is recovered by
//! the next invocation resuming from the last persisted phase. Failures are
//! charged to the attempt through the [`ErrorAccountant`].

use std::sync::Arc;

use chrono::Utc;
use staker_chain::{DepositLogSource, StakingContractClient};
use staker_config::SagaConfig;
use staker_escrow::KeyEscrow;
use staker_provisioner::{CreateRequest, PollPolicy, ProvisioningApi, StatusReport, poll_until_ready};
use staker_store::StateStore;
use staker_types::{
  CorrelationId, DepositDatum, ProvisionedValidator, RegistrationParams, TxReceipt, TxRef, ValidatorBatch,
  ValidatorStatus,
};
use tracing::{info, instrument, warn};

use crate::accountant::{ErrorAccountant, FailureRecord};
use crate::capacity::CapacitySnapshot;
use crate::error::SagaError;
use crate::events::{ClearReason, NoopNotifier, SagaEvent, SagaNotifier};
use crate::guard::FrontRunGuard;
use crate::machine::{self, Effect, Event};
use crate::slot::StateSlot;
use crate::state::{Phase, PhaseKind, WorkflowState};

/// External systems the saga drives.
#[derive(Clone)]
pub struct Collaborators {
  pub provisioner: Arc<dyn ProvisioningApi>,
  pub contract: Arc<dyn StakingContractClient>,
  pub deposit_logs: Arc<dyn DepositLogSource>,
  pub escrow: Arc<dyn KeyEscrow>,
  pub store: Arc<dyn StateStore>,
}

/// Result of a registration invocation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
  /// The contract is halted; nothing was done.
  Paused,
  /// Not enough capacity for the requested batch; nothing was done.
  InsufficientCapacity { available: u64, requested: u32 },
  /// No workflow to resume and a batch of zero was asked for; nothing was done.
  NothingRequested,
  /// This invocation brought the batch to `REGISTERED`.
  Registered {
    correlation_id: CorrelationId,
    count: usize,
  },
  /// A batch was already registered and is waiting for a staking run.
  AwaitingStake { correlation_id: CorrelationId },
  /// The stored workflow is past registration.
  StakingInProgress {
    correlation_id: CorrelationId,
    phase: PhaseKind,
  },
}

/// Result of a staking invocation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingOutcome {
  Paused,
  /// No workflow state and nothing configured to recover.
  NothingToStake,
  /// The stored workflow has not finished registration.
  RegistrationPending {
    correlation_id: CorrelationId,
    phase: PhaseKind,
  },
  /// The contract does not consider the batch registered yet.
  NotEligible {
    correlation_id: CorrelationId,
    status: ValidatorStatus,
  },
  /// The batch was staked or exited by someone else; state was cleared.
  AlreadyStaked {
    correlation_id: CorrelationId,
    status: ValidatorStatus,
  },
  /// Not enough capacity for the batch; state is kept for a later run.
  InsufficientCapacity { available: u64, required: usize },
  /// Deposits confirmed and state cleared.
  Staked {
    correlation_id: CorrelationId,
    count: usize,
  },
}

pub struct ValidatorProvisioningSaga<N: SagaNotifier = NoopNotifier> {
  provisioner: Arc<dyn ProvisioningApi>,
  contract: Arc<dyn StakingContractClient>,
  escrow: Arc<dyn KeyEscrow>,
  slot: StateSlot,
  accountant: ErrorAccountant,
  guard: FrontRunGuard,
  config: SagaConfig,
  notifier: N,
}

impl ValidatorProvisioningSaga<NoopNotifier> {
  pub fn new(collaborators: Collaborators, config: SagaConfig) -> Self {
    Self::with_notifier(collaborators, config, NoopNotifier)
  }
}

impl<N: SagaNotifier> ValidatorProvisioningSaga<N> {
  pub fn with_notifier(collaborators: Collaborators, config: SagaConfig, notifier: N) -> Self {
    let slot = StateSlot::new(collaborators.store);
    Self {
      provisioner: collaborators.provisioner,
      contract: collaborators.contract,
      escrow: collaborators.escrow,
      accountant: ErrorAccountant::new(slot.clone(), config.error_threshold),
      guard: FrontRunGuard::new(collaborators.deposit_logs),
      slot,
      config,
      notifier,
    }
  }

  pub fn config(&self) -> &SagaConfig {
    &self.config
  }

  pub async fn current_state(&self) -> Result<Option<WorkflowState>, SagaError> {
    self.slot.load().await
  }

  /// Operator reset: empty the slot regardless of phase.
  ///
  /// Returns the id of the attempt that was dropped, if any.
  pub async fn clear_state(&self) -> Result<Option<CorrelationId>, SagaError> {
    let state = self.slot.take().await?;

    if let Some(state) = &state {
      self.notifier.notify(SagaEvent::Cleared {
        correlation_id: state.correlation_id.clone(),
        reason: ClearReason::Operator,
      });
    }
    Ok(state.map(|state| state.correlation_id))
  }

  /// Create and register up to `max_validators` validators, or resume a
  /// registration that an earlier invocation left unfinished.
  #[instrument(name = "saga_registration", skip(self))]
  pub async fn run_registration(
    &self,
    max_validators: u32,
    operational_period_days: u32,
  ) -> Result<RegistrationOutcome, SagaError> {
    let result = self.registration_steps(max_validators, operational_period_days).await;
    self.settle(result).await
  }

  /// Fund a registered batch with beacon deposits, or resume a staking run
  /// that an earlier invocation left unfinished.
  #[instrument(name = "saga_staking", skip(self))]
  pub async fn run_staking(&self) -> Result<StakingOutcome, SagaError> {
    let result = self.staking_steps().await;
    self.settle(result).await
  }

  async fn registration_steps(
    &self,
    max_validators: u32,
    operational_period_days: u32,
  ) -> Result<RegistrationOutcome, SagaError> {
    if self.contract.paused().await? {
      info!("contract_paused");
      return Ok(RegistrationOutcome::Paused);
    }

    let capacity = self.capacity().await?;
    let available = capacity.validators();
    if available < u64::from(max_validators) {
      info!(
        available,
        requested = max_validators,
        asset_balance = %capacity.asset_balance,
        stake_threshold = %capacity.stake_threshold,
        stake_tally = %capacity.stake_tally,
        "insufficient_capacity"
      );
      return Ok(RegistrationOutcome::InsufficientCapacity {
        available,
        requested: max_validators,
      });
    }

    let mut advanced = false;
    let mut state = self.slot.load().await?;

    loop {
      let Some(current) = state.as_ref() else {
        if max_validators == 0 {
          info!("nothing_requested");
          return Ok(RegistrationOutcome::NothingRequested);
        }
        state = Some(self.issue_creation(max_validators, operational_period_days).await?);
        advanced = true;
        continue;
      };

      let next = match &current.phase {
        Phase::CreationIssued { .. } => self.confirm_creation(current).await?,
        Phase::CreationConfirmed { batch, registration } => {
          self.broadcast_registration(current, batch, registration).await?
        }
        Phase::RegisterBroadcast { tx, .. } => {
          let receipt = self.await_receipt(tx).await?;
          self.apply(Some(current), Event::RegistrationMined { receipt }).await?
        }
        Phase::Registered { batch } => {
          let correlation_id = current.correlation_id.clone();
          if advanced {
            return Ok(RegistrationOutcome::Registered {
              correlation_id,
              count: batch.len(),
            });
          }
          info!(correlation_id = %correlation_id, "registration_already_complete");
          return Ok(RegistrationOutcome::AwaitingStake { correlation_id });
        }
        phase => {
          info!(correlation_id = %current.correlation_id, phase = %phase.kind(), "staking_in_progress");
          return Ok(RegistrationOutcome::StakingInProgress {
            correlation_id: current.correlation_id.clone(),
            phase: phase.kind(),
          });
        }
      };

      advanced = true;
      state = Some(next);
    }
  }

  async fn staking_steps(&self) -> Result<StakingOutcome, SagaError> {
    if self.contract.paused().await? {
      info!("contract_paused");
      return Ok(StakingOutcome::Paused);
    }

    let mut state = self.slot.load().await?;

    loop {
      let Some(current) = state.as_ref() else {
        match self.recover_registered().await? {
          Ok(recovered) => {
            state = Some(recovered);
            continue;
          }
          Err(outcome) => return Ok(outcome),
        }
      };

      let next = match &current.phase {
        Phase::Registered { batch } => {
          let pubkey = batch.first_pubkey();
          let status = self.contract.validator_state(&pubkey).await?;
          match status {
            ValidatorStatus::Registered => {
              let deposits = self.fetch_deposit_data(&current.correlation_id).await?;
              self.apply(Some(current), Event::DepositDataReady { deposits }).await?
            }
            ValidatorStatus::NotRegistered => {
              info!(correlation_id = %current.correlation_id, pubkey = %pubkey, "registration_not_visible");
              return Ok(StakingOutcome::NotEligible {
                correlation_id: current.correlation_id.clone(),
                status,
              });
            }
            _ => {
              warn!(
                correlation_id = %current.correlation_id,
                pubkey = %pubkey,
                status = %status,
                "batch_already_staked"
              );
              self.slot.clear().await?;
              self.notifier.notify(SagaEvent::Cleared {
                correlation_id: current.correlation_id.clone(),
                reason: ClearReason::AlreadyStaked,
              });
              return Ok(StakingOutcome::AlreadyStaked {
                correlation_id: current.correlation_id.clone(),
                status,
              });
            }
          }
        }
        Phase::DepositDataGot { batch, deposits } => {
          let capacity = self.capacity().await?;
          let available = capacity.validators();
          if available < batch.len() as u64 {
            info!(
              correlation_id = %current.correlation_id,
              available,
              required = batch.len(),
              "insufficient_capacity"
            );
            return Ok(StakingOutcome::InsufficientCapacity {
              available,
              required: batch.len(),
            });
          }
          let tx = self.broadcast_deposits(batch, deposits).await?;
          self.apply(Some(current), Event::DepositBroadcast { tx }).await?
        }
        Phase::DepositBroadcast { batch, tx, .. } => {
          let receipt = self.await_receipt(tx).await?;
          self.apply(Some(current), Event::DepositMined { receipt }).await?;
          return Ok(self.completed(current, batch));
        }
        Phase::DepositConfirmed { batch } => {
          self.slot.clear().await?;
          return Ok(self.completed(current, batch));
        }
        phase => {
          info!(correlation_id = %current.correlation_id, phase = %phase.kind(), "registration_pending");
          return Ok(StakingOutcome::RegistrationPending {
            correlation_id: current.correlation_id.clone(),
            phase: phase.kind(),
          });
        }
      };

      state = Some(next);
    }
  }

  async fn issue_creation(&self, count: u32, operational_period_days: u32) -> Result<WorkflowState, SagaError> {
    let request = CreateRequest {
      request_id: CorrelationId::generate().to_string(),
      count,
      withdrawal_address: self.config.withdrawal_address.clone(),
      fee_recipient: self.config.fee_recipient.clone(),
      operator_ids: self.config.operator_ids.clone(),
      operational_period_days,
    };
    info!(request_id = %request.request_id, count, "creation_requested");

    let correlation_id = self.provisioner.create(&request).await?;
    let state = self
      .apply(None, Event::CreationIssued { correlation_id, requested: count })
      .await?;

    // Key generation takes a while; status is not worth asking for before.
    tokio::time::sleep(self.config.poll.initial_delay()).await;
    Ok(state)
  }

  async fn confirm_creation(&self, current: &WorkflowState) -> Result<WorkflowState, SagaError> {
    let report = self.poll_status(&current.correlation_id).await?;
    let registration = report
      .registration
      .ok_or_else(|| SagaError::invalid_service_data("ready status carries no registration params"))?;

    self
      .apply(
        Some(current),
        Event::CreationReady {
          validators: report.validators,
          registration,
        },
      )
      .await
  }

  async fn broadcast_registration(
    &self,
    current: &WorkflowState,
    batch: &ValidatorBatch,
    registration: &serde_json::Value,
  ) -> Result<WorkflowState, SagaError> {
    let pubkey = batch.first_pubkey();
    let status = self.contract.validator_state(&pubkey).await?;
    if status != ValidatorStatus::NotRegistered {
      return Err(SagaError::DuplicateRegistration { pubkey, status });
    }

    let mut params = RegistrationParams::decode(registration, batch)?;
    if let Some(amount) = self.config.registration_amount_override {
      if amount != params.amount {
        warn!(
          correlation_id = %current.correlation_id,
          service_amount = %params.amount,
          override_amount = %amount,
          "registration_amount_overridden"
        );
      }
      params.amount = amount;
    }

    let tx = self.contract.register_validators(&params).await?;
    info!(correlation_id = %current.correlation_id, tx = %tx, count = batch.len(), "registration_broadcast");
    self.apply(Some(current), Event::RegistrationBroadcast { tx }).await
  }

  async fn broadcast_deposits(&self, batch: &ValidatorBatch, deposits: &[DepositDatum]) -> Result<TxRef, SagaError> {
    self
      .guard
      .check_no_prior_deposit(&batch.pubkeys(), self.config.front_run_window_blocks)
      .await?;

    let tx = self.contract.stake_validators(deposits).await?;
    info!(tx = %tx, count = deposits.len(), "deposit_broadcast");
    Ok(tx)
  }

  /// Rebuild a `REGISTERED` state for the configured correlation id, when the
  /// slot is empty. `Err` carries the outcome to return instead.
  async fn recover_registered(&self) -> Result<Result<WorkflowState, StakingOutcome>, SagaError> {
    let Some(correlation_id) = self.config.recover_correlation_id.as_deref().map(CorrelationId::new) else {
      return Ok(Err(StakingOutcome::NothingToStake));
    };

    let report = self.poll_status(&correlation_id).await?;
    let pubkey = report
      .validators
      .first()
      .map(|validator| validator.pubkey)
      .ok_or_else(|| SagaError::invalid_service_data("recovered status lists no validators"))?;

    let status = self.contract.validator_state(&pubkey).await?;
    if status != ValidatorStatus::Registered {
      info!(correlation_id = %correlation_id, status = %status, "recovery_not_eligible");
      return Ok(Err(StakingOutcome::NotEligible { correlation_id, status }));
    }

    info!(correlation_id = %correlation_id, count = report.validators.len(), "workflow_recovered");
    let state = self
      .apply(
        None,
        Event::Recovered {
          correlation_id,
          validators: report.validators,
        },
      )
      .await?;
    Ok(Ok(state))
  }

  async fn poll_status(&self, id: &CorrelationId) -> Result<StatusReport, SagaError> {
    let api = self.provisioner.as_ref();
    let report = poll_until_ready("status", self.poll_policy(), move || async move {
      api.status(id).await.map(|report| report.ready.then_some(report))
    })
    .await?;
    Ok(report)
  }

  async fn fetch_deposit_data(&self, id: &CorrelationId) -> Result<Vec<DepositDatum>, SagaError> {
    let api = self.provisioner.as_ref();
    let deposits = poll_until_ready("deposit_data", self.poll_policy(), move || async move {
      api
        .deposit_data(id)
        .await
        .map(|report| report.ready.then_some(report.deposit_data))
    })
    .await?;
    Ok(deposits)
  }

  async fn await_receipt(&self, tx: &TxRef) -> Result<TxReceipt, SagaError> {
    let receipt = self.contract.wait_for_receipt(tx).await?;
    if !receipt.success {
      return Err(SagaError::TransactionReverted {
        tx: tx.clone(),
        block_number: receipt.block_number,
      });
    }
    Ok(receipt)
  }

  async fn capacity(&self) -> Result<CapacitySnapshot, SagaError> {
    Ok(CapacitySnapshot::read(self.contract.as_ref(), self.config.unit_stake).await?)
  }

  fn poll_policy(&self) -> PollPolicy {
    PollPolicy::from(&self.config.poll)
  }

  /// Run the transition for `event` and carry out its effects.
  async fn apply(&self, current: Option<&WorkflowState>, event: Event) -> Result<WorkflowState, SagaError> {
    let from = current.map(WorkflowState::kind);
    let transition = machine::transition(current, event, Utc::now())?;

    for effect in transition.effects {
      match effect {
        Effect::Persist(state) => self.slot.save(&state).await?,
        Effect::Clear => self.slot.clear().await?,
        Effect::EscrowKeys(validators) => self.escrow_keys(&validators).await,
      }
    }

    let state = transition.state;
    info!(
      correlation_id = %state.correlation_id,
      from = ?from,
      to = %state.kind(),
      "phase_advanced"
    );
    self.notifier.notify(SagaEvent::PhaseAdvanced {
      correlation_id: state.correlation_id.clone(),
      from,
      to: state.kind(),
    });
    Ok(state)
  }

  async fn escrow_keys(&self, validators: &[ProvisionedValidator]) {
    for validator in validators {
      if let Err(e) = self
        .escrow
        .store(&validator.pubkey, &validator.encrypted_private_key)
        .await
      {
        warn!(pubkey = %validator.pubkey, error = %e, "key_escrow_failed");
      }
    }
  }

  fn completed(&self, current: &WorkflowState, batch: &ValidatorBatch) -> StakingOutcome {
    info!(correlation_id = %current.correlation_id, count = batch.len(), "staking_complete");
    self.notifier.notify(SagaEvent::Cleared {
      correlation_id: current.correlation_id.clone(),
      reason: ClearReason::Completed,
    });
    StakingOutcome::Staked {
      correlation_id: current.correlation_id.clone(),
      count: batch.len(),
    }
  }

  /// Charge a failed invocation to the stored attempt, if there is one.
  async fn settle<T>(&self, result: Result<T, SagaError>) -> Result<T, SagaError> {
    let err = match result {
      Ok(value) => return Ok(value),
      Err(err) => err,
    };

    let state = match self.slot.load().await {
      Ok(Some(state)) => state,
      Ok(None) => {
        warn!(error = %err, "invocation_failed_without_state");
        return Err(err);
      }
      Err(load_err) => {
        warn!(error = %err, load_error = %load_err, "failure_not_recorded");
        return Err(err);
      }
    };

    match self.accountant.record_failure(&state.correlation_id, &err).await {
      Ok(FailureRecord::Recorded { error_count }) => {
        self.notifier.notify(SagaEvent::FailureRecorded {
          correlation_id: state.correlation_id,
          error_count,
          error: err.to_string(),
        });
        Err(err)
      }
      Ok(FailureRecord::Abandoned { error_count }) => {
        self.notifier.notify(SagaEvent::Abandoned {
          correlation_id: state.correlation_id.clone(),
          error_count,
          error: err.to_string(),
        });
        Err(SagaError::Abandoned {
          correlation_id: state.correlation_id,
          error_count,
          source: Box::new(err),
        })
      }
      Ok(FailureRecord::NoState | FailureRecord::Mismatch { .. }) => Err(err),
      Err(record_err) => {
        warn!(error = %err, record_error = %record_err, "failure_not_recorded");
        Err(err)
      }
    }
  }
}
