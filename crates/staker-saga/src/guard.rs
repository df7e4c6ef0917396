//! Front-run protection for beacon deposits.
//!
//! Before broadcasting deposits, scan recent `DepositEvent` logs of the
//! canonical deposit contract for any of the batch's pubkeys. A hit means
//! someone else already deposited for that key, possibly with different
//! withdrawal credentials, and the batch must not be staked.

use std::collections::HashSet;
use std::sync::Arc;

use staker_chain::{ChainError, DepositEvent, DepositLogSource};
use staker_types::BlsPubkey;
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_WINDOW_BLOCKS: u64 = 1000;

#[derive(Debug, Error)]
pub enum GuardError {
  #[error("front-run detected: {pubkey} already has a deposit in block {block_number}")]
  FrontRun { pubkey: BlsPubkey, block_number: u64 },

  #[error("deposit log in block {block_number} does not decode: {source}")]
  UndecodableLog {
    block_number: u64,
    #[source]
    source: ChainError,
  },

  #[error("front-run check failed: {0}")]
  Chain(#[from] ChainError),
}

pub struct FrontRunGuard {
  logs: Arc<dyn DepositLogSource>,
}

impl FrontRunGuard {
  pub fn new(logs: Arc<dyn DepositLogSource>) -> Self {
    Self { logs }
  }

  /// Fail if any of `pubkeys` appears in deposit logs from the last
  /// `window_blocks` blocks. A log that does not decode fails the check with
  /// [`GuardError::UndecodableLog`]. An empty `pubkeys` always passes.
  pub async fn check_no_prior_deposit(&self, pubkeys: &[BlsPubkey], window_blocks: u64) -> Result<(), GuardError> {
    let latest = self.logs.latest_block().await?;
    let from = latest.saturating_sub(window_blocks);
    let logs = self.logs.deposit_logs(from, latest).await?;

    let targets: HashSet<BlsPubkey> = pubkeys.iter().copied().collect();
    let scan = if targets.is_empty() { &[][..] } else { &logs[..] };
    for log in scan {
      let event = DepositEvent::decode(&log.data).map_err(|source| {
        error!(block_number = log.block_number, error = %source, "deposit_log_undecodable");
        GuardError::UndecodableLog {
          block_number: log.block_number,
          source,
        }
      })?;
      if targets.contains(&event.pubkey) {
        error!(
          pubkey = %event.pubkey,
          block_number = log.block_number,
          "front_run_detected"
        );
        return Err(GuardError::FrontRun {
          pubkey: event.pubkey,
          block_number: log.block_number,
        });
      }
    }

    debug!(from, latest, scanned = scan.len(), "front_run_check_passed");
    Ok(())
  }
}
