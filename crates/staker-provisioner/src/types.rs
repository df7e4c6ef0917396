use serde::{Deserialize, Serialize};
use staker_types::{DepositDatum, ProvisionedValidator};

/// Body of a validator creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
  /// Client-generated key so a retried create is recognised by the service.
  pub request_id: String,
  pub count: u32,
  pub withdrawal_address: String,
  pub fee_recipient: String,
  pub operator_ids: Vec<u64>,
  /// How long the validator network cluster is prefunded for, in days.
  pub operational_period_days: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateResponse {
  pub id: String,
}

/// Status of a creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
  pub ready: bool,
  #[serde(default)]
  pub validators: Vec<ProvisionedValidator>,
  /// Unsigned registration call arguments, passed through verbatim.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub registration: Option<serde_json::Value>,
}

/// Deposit data for a registered batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositDataReport {
  pub ready: bool,
  #[serde(default)]
  pub deposit_data: Vec<DepositDatum>,
}
