use serde::{Deserialize, Serialize};

use crate::bytes::HexBytes;
use crate::error::TypesError;
use crate::pubkey::BlsPubkey;
use crate::validator::ValidatorBatch;

/// Snapshot of the operator cluster the validators join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
  pub validator_count: u32,
  pub network_fee_index: u64,
  pub index: u64,
  pub active: bool,
  #[serde(with = "crate::amount")]
  pub balance: u128,
}

/// Decoded arguments of the cluster registration call.
///
/// The provisioning service hands these over unsigned; they are kept raw in
/// workflow state and decoded right before broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationParams {
  pub pubkeys: Vec<BlsPubkey>,
  pub operator_ids: Vec<u64>,
  pub shares: Vec<HexBytes>,
  #[serde(with = "crate::amount")]
  pub amount: u128,
  pub cluster: ClusterInfo,
}

impl RegistrationParams {
  /// Decode raw params and check them against the batch they belong to.
  pub fn decode(raw: &serde_json::Value, batch: &ValidatorBatch) -> Result<Self, TypesError> {
    let params: Self = serde_json::from_value(raw.clone())?;
    params.validate_against(batch)?;
    Ok(params)
  }

  pub fn validate_against(&self, batch: &ValidatorBatch) -> Result<(), TypesError> {
    if self.pubkeys != batch.pubkeys() {
      return Err(TypesError::registration(
        "pubkeys do not match the provisioned batch",
      ));
    }

    if self.shares.len() != self.pubkeys.len() {
      return Err(TypesError::registration(format!(
        "expected {} share entries, got {}",
        self.pubkeys.len(),
        self.shares.len()
      )));
    }

    if self.operator_ids.is_empty() {
      return Err(TypesError::registration("operator ids are empty"));
    }

    // Cluster identity is derived from the operator set; order must be canonical.
    if !self.operator_ids.windows(2).all(|w| w[0] < w[1]) {
      return Err(TypesError::registration(
        "operator ids must be sorted and unique",
      ));
    }

    Ok(())
  }
}
