//! Staker Escrow
//!
//! This crate provides the key escrow trait and a filesystem implementation.
//! Escrow keeps an operator-recoverable copy of each validator's encrypted
//! keystore outside of workflow state.
//!
//! The [`KeyEscrow`] trait is the backend layer; implementations decide where
//! the material lands (local disk, object storage, ...). Escrow is best-effort
//! from the saga's point of view: the same material is already captured in
//! persisted workflow state.

mod fs;

pub use fs::FsKeyEscrow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use staker_types::BlsPubkey;

/// Error type for escrow operations.
#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
  /// No escrowed key exists for this pubkey.
  #[error("escrowed key not found: {0}")]
  NotFound(BlsPubkey),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The escrow record could not be encoded or decoded.
  #[error("invalid escrow record: {0}")]
  Encoding(#[from] serde_json::Error),
}

/// Document written for each escrowed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
  pub pubkey: BlsPubkey,
  pub encrypted_private_key: String,
}

impl EscrowRecord {
  pub fn to_bytes(&self) -> Result<Vec<u8>, EscrowError> {
    Ok(serde_json::to_vec_pretty(self)?)
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self, EscrowError> {
    Ok(serde_json::from_slice(bytes)?)
  }
}

/// Key escrow trait.
#[async_trait]
pub trait KeyEscrow: Send + Sync {
  /// Store the encrypted key for a validator, replacing any previous copy.
  async fn store(&self, pubkey: &BlsPubkey, encrypted_private_key: &str) -> Result<(), EscrowError>;

  /// Fetch a previously escrowed key.
  async fn fetch(&self, pubkey: &BlsPubkey) -> Result<EscrowRecord, EscrowError>;
}
