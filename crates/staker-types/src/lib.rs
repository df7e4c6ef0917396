//! Staker Types
//!
//! Shared vocabulary for the validator provisioning crates: public keys,
//! provisioned validator batches, deposit data, decoded registration calls and
//! transaction references.
//!
//! Everything here is plain data. Validation happens at construction or
//! decode time so that the orchestrator only ever holds well-formed values.

pub mod amount;
mod bytes;
mod correlation;
mod deposit;
mod error;
mod pubkey;
mod registration;
mod tx;
mod validator;

pub use bytes::HexBytes;
pub use correlation::CorrelationId;
pub use deposit::DepositDatum;
pub use error::TypesError;
pub use pubkey::BlsPubkey;
pub use registration::{ClusterInfo, RegistrationParams};
pub use tx::{TxReceipt, TxRef};
pub use validator::{ProvisionedValidator, ValidatorBatch, ValidatorStatus};

/// One ether in wei.
pub const ETHER: u128 = 1_000_000_000_000_000_000;

/// Amount required to fund a single validator, in wei.
pub const VALIDATOR_DEPOSIT: u128 = 32 * ETHER;
