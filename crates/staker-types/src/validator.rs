use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bytes::HexBytes;
use crate::error::TypesError;
use crate::pubkey::BlsPubkey;

/// A validator produced by the provisioning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedValidator {
  pub pubkey: BlsPubkey,
  /// Encrypted key shares for the validator network operators.
  pub share_data: HexBytes,
  /// Encrypted keystore for the full validator key.
  pub encrypted_private_key: String,
}

/// An ordered, non-empty batch of validators created by one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ProvisionedValidator>", into = "Vec<ProvisionedValidator>")]
pub struct ValidatorBatch {
  validators: Vec<ProvisionedValidator>,
}

impl ValidatorBatch {
  pub fn new(validators: Vec<ProvisionedValidator>) -> Result<Self, TypesError> {
    if validators.is_empty() {
      return Err(TypesError::registration("validator batch is empty"));
    }
    Ok(Self { validators })
  }

  /// The key consulted by on-chain guards before writing.
  pub fn first_pubkey(&self) -> BlsPubkey {
    self.validators[0].pubkey
  }

  pub fn pubkeys(&self) -> Vec<BlsPubkey> {
    self.validators.iter().map(|v| v.pubkey).collect()
  }

  pub fn validators(&self) -> &[ProvisionedValidator] {
    &self.validators
  }

  pub fn len(&self) -> usize {
    self.validators.len()
  }

  pub fn is_empty(&self) -> bool {
    self.validators.is_empty()
  }
}

impl TryFrom<Vec<ProvisionedValidator>> for ValidatorBatch {
  type Error = TypesError;

  fn try_from(validators: Vec<ProvisionedValidator>) -> Result<Self, Self::Error> {
    Self::new(validators)
  }
}

impl From<ValidatorBatch> for Vec<ProvisionedValidator> {
  fn from(batch: ValidatorBatch) -> Self {
    batch.validators
  }
}

/// On-chain lifecycle of a validator as recorded by the staking contract.
///
/// Variant order matches the contract's enum index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorStatus {
  NotRegistered,
  Registered,
  Staked,
  Exited,
  ExitComplete,
}

impl TryFrom<u8> for ValidatorStatus {
  type Error = TypesError;

  fn try_from(index: u8) -> Result<Self, Self::Error> {
    match index {
      0 => Ok(Self::NotRegistered),
      1 => Ok(Self::Registered),
      2 => Ok(Self::Staked),
      3 => Ok(Self::Exited),
      4 => Ok(Self::ExitComplete),
      other => Err(TypesError::UnknownStatus(other)),
    }
  }
}

impl fmt::Display for ValidatorStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::NotRegistered => "NOT_REGISTERED",
      Self::Registered => "REGISTERED",
      Self::Staked => "STAKED",
      Self::Exited => "EXITED",
      Self::ExitComplete => "EXIT_COMPLETE",
    };
    f.write_str(name)
  }
}
