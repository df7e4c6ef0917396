use staker_chain::ChainError;
use staker_provisioner::ProvisionerError;
use staker_store::StoreError;
use staker_types::{BlsPubkey, CorrelationId, TxRef, TypesError, ValidatorStatus};
use thiserror::Error;

use crate::guard::GuardError;
use crate::machine::TransitionError;

/// Errors surfaced by a saga invocation.
#[derive(Debug, Error)]
pub enum SagaError {
  #[error("state store error: {0}")]
  Store(#[from] StoreError),

  #[error("failed to encode workflow state: {0}")]
  Encoding(#[from] serde_json::Error),

  #[error("provisioning service error: {0}")]
  Provisioner(#[from] ProvisionerError),

  #[error("chain error: {0}")]
  Chain(#[from] ChainError),

  #[error(transparent)]
  Guard(#[from] GuardError),

  #[error(transparent)]
  Transition(#[from] TransitionError),

  #[error("invalid registration params: {0}")]
  InvalidRegistration(#[from] TypesError),

  #[error("invalid data from provisioning service: {message}")]
  InvalidServiceData { message: String },

  /// The first validator of the batch is already known to the contract.
  #[error("validator {pubkey} is already {status} on chain; refusing to register")]
  DuplicateRegistration {
    pubkey: BlsPubkey,
    status: ValidatorStatus,
  },

  #[error("transaction {tx} reverted in block {block_number}")]
  TransactionReverted { tx: TxRef, block_number: u64 },

  /// The failure that pushed the attempt over the error threshold.
  #[error("workflow {correlation_id} abandoned after {error_count} failures: {source}")]
  Abandoned {
    correlation_id: CorrelationId,
    error_count: u32,
    #[source]
    source: Box<SagaError>,
  },
}

impl SagaError {
  pub(crate) fn invalid_service_data(message: impl Into<String>) -> Self {
    Self::InvalidServiceData {
      message: message.into(),
    }
  }
}
