//! Staking capacity.

use staker_chain::{ChainError, StakingContractClient};

/// Number of whole validators the strategy can fund right now.
///
/// The smaller of the spendable balance and the remaining room under the
/// threshold, divided by the unit stake. A tally above the threshold or a zero
/// unit stake yields zero.
pub fn compute_stakeable_validator_count(
  asset_balance: u128,
  stake_threshold: u128,
  stake_tally: u128,
  unit_stake: u128,
) -> u64 {
  if unit_stake == 0 {
    return 0;
  }
  let room = stake_threshold.saturating_sub(stake_tally);
  let count = asset_balance.min(room) / unit_stake;
  u64::try_from(count).unwrap_or(u64::MAX)
}

/// Contract figures capacity is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacitySnapshot {
  pub asset_balance: u128,
  pub stake_threshold: u128,
  pub stake_tally: u128,
  pub unit_stake: u128,
}

impl CapacitySnapshot {
  pub async fn read(contract: &dyn StakingContractClient, unit_stake: u128) -> Result<Self, ChainError> {
    Ok(Self {
      asset_balance: contract.asset_balance().await?,
      stake_threshold: contract.stake_threshold().await?,
      stake_tally: contract.stake_tally().await?,
      unit_stake,
    })
  }

  pub fn validators(&self) -> u64 {
    compute_stakeable_validator_count(
      self.asset_balance,
      self.stake_threshold,
      self.stake_tally,
      self.unit_stake,
    )
  }
}
