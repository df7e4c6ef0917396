//! Staker Chain
//!
//! This crate defines the on-chain boundary of the provisioning saga:
//! - [`StakingContractClient`]: reads and writes against the staking strategy
//!   contract
//! - [`DepositLogSource`]: log queries against the canonical beacon deposit
//!   contract
//! - [`DepositEvent`]: decoder for the deposit contract's `DepositEvent` log
//!
//! Transport, signing and nonce management belong to the adapters that
//! implement these traits.

mod deposit_event;
mod error;

pub use deposit_event::{DepositEvent, DepositLog};
pub use error::ChainError;

use async_trait::async_trait;
use staker_types::{BlsPubkey, DepositDatum, RegistrationParams, TxReceipt, TxRef, ValidatorStatus};

/// Client for the staking strategy contract.
///
/// Both write methods only broadcast; callers must follow up with
/// [`StakingContractClient::wait_for_receipt`] before treating a write as done.
#[async_trait]
pub trait StakingContractClient: Send + Sync {
  /// Whether the contract is halted.
  async fn paused(&self) -> Result<bool, ChainError>;

  /// Balance the strategy can put towards new deposits, in wei.
  async fn asset_balance(&self) -> Result<u128, ChainError>;

  /// Total stake the strategy may hold, in wei.
  async fn stake_threshold(&self) -> Result<u128, ChainError>;

  /// Stake already committed, in wei.
  async fn stake_tally(&self) -> Result<u128, ChainError>;

  /// Lifecycle state the contract records for a validator.
  async fn validator_state(&self, pubkey: &BlsPubkey) -> Result<ValidatorStatus, ChainError>;

  /// Broadcast the cluster registration for a batch of validators.
  async fn register_validators(&self, params: &RegistrationParams) -> Result<TxRef, ChainError>;

  /// Broadcast the beacon deposits for a batch of validators.
  async fn stake_validators(&self, deposits: &[DepositDatum]) -> Result<TxRef, ChainError>;

  /// Block until the transaction is mined.
  async fn wait_for_receipt(&self, tx: &TxRef) -> Result<TxReceipt, ChainError>;
}

/// Log access for the canonical beacon deposit contract.
#[async_trait]
pub trait DepositLogSource: Send + Sync {
  /// Latest block number.
  async fn latest_block(&self) -> Result<u64, ChainError>;

  /// `DepositEvent` logs emitted in `[from_block, to_block]`, inclusive.
  async fn deposit_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<DepositLog>, ChainError>;
}
