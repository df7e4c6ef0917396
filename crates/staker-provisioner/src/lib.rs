//! Staker Provisioner
//!
//! I/O boundary for the third-party validator provisioning service.
//!
//! - [`ProvisioningApi`] is the trait the saga depends on.
//! - [`HttpProvisioningApi`] implements it over HTTP with `reqwest`.
//! - [`poll_until_ready`] drives a not-yet-ready endpoint under a bounded
//!   [`PollPolicy`], retrying transient failures.
//!
//! `create` is not idempotent on the service side beyond the idempotency key,
//! so callers must only issue it when they hold no in-flight request.

mod error;
mod http;
mod poll;
mod types;

pub use error::ProvisionerError;
pub use http::HttpProvisioningApi;
pub use poll::{PollPolicy, poll_until_ready};
pub use types::{CreateRequest, DepositDataReport, StatusReport};

use async_trait::async_trait;
use staker_types::CorrelationId;

/// Operations offered by the validator provisioning service.
#[async_trait]
pub trait ProvisioningApi: Send + Sync {
  /// Request creation of a validator batch. Returns the service's id for it.
  async fn create(&self, request: &CreateRequest) -> Result<CorrelationId, ProvisionerError>;

  /// Current status of a creation request.
  async fn status(&self, id: &CorrelationId) -> Result<StatusReport, ProvisionerError>;

  /// Deposit data for a registered batch.
  async fn deposit_data(&self, id: &CorrelationId) -> Result<DepositDataReport, ProvisionerError>;
}
