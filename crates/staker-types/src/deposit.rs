use serde::{Deserialize, Serialize};

use crate::bytes::HexBytes;
use crate::error::TypesError;
use crate::pubkey::BlsPubkey;

/// Parameters of one beacon-chain deposit, produced once by the provisioning
/// service and consumed once by the staking transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositDatum {
  pub pubkey: BlsPubkey,
  pub signature: HexBytes,
  pub deposit_data_root: HexBytes,
}

impl DepositDatum {
  pub const SIGNATURE_LEN: usize = 96;
  pub const ROOT_LEN: usize = 32;

  /// Check fixed field lengths.
  pub fn validate(&self) -> Result<(), TypesError> {
    check_len("signature", Self::SIGNATURE_LEN, self.signature.len())?;
    check_len("deposit_data_root", Self::ROOT_LEN, self.deposit_data_root.len())
  }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), TypesError> {
  if expected == actual {
    Ok(())
  } else {
    Err(TypesError::Length {
      field,
      expected,
      actual,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validate_lengths() {
    let mut datum = DepositDatum {
      pubkey: BlsPubkey::new([1; 48]),
      signature: HexBytes::new(vec![2; 96]),
      deposit_data_root: HexBytes::new(vec![3; 32]),
    };
    assert!(datum.validate().is_ok());

    datum.signature = HexBytes::new(vec![2; 95]);
    assert!(matches!(
      datum.validate(),
      Err(TypesError::Length {
        field: "signature",
        ..
      })
    ));
  }
}
