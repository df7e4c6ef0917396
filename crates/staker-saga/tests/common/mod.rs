//! In-memory collaborators for saga tests.
//!
//! Every fake counts its calls and can be told to fail the next N calls of a
//! named operation, which is how tests simulate a crash between steps.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use staker_chain::{ChainError, DepositEvent, DepositLog, DepositLogSource, StakingContractClient};
use staker_config::{PollConfig, SagaConfig};
use staker_escrow::{EscrowError, EscrowRecord, KeyEscrow};
use staker_provisioner::{
  CreateRequest, DepositDataReport, ProvisionerError, ProvisioningApi, StatusReport,
};
use staker_saga::{Collaborators, NoopNotifier, SagaNotifier, ValidatorProvisioningSaga};
use staker_store::{InMemoryStateStore, StateStore};
use staker_types::{
  BlsPubkey, ClusterInfo, CorrelationId, DepositDatum, HexBytes, ProvisionedValidator,
  RegistrationParams, TxReceipt, TxRef, VALIDATOR_DEPOSIT, ValidatorStatus,
};

pub const CORRELATION_ID: &str = "abc";
pub const OPERATOR_IDS: [u64; 4] = [1, 5, 9, 12];

/// Remaining injected failures per operation name.
#[derive(Default)]
pub struct Failpoints(Mutex<HashMap<&'static str, u32>>);

impl Failpoints {
  pub fn fail(&self, op: &'static str, times: u32) {
    self.0.lock().unwrap().insert(op, times);
  }

  fn take(&self, op: &'static str) -> bool {
    let mut map = self.0.lock().unwrap();
    match map.get_mut(op) {
      Some(remaining) if *remaining > 0 => {
        *remaining -= 1;
        true
      }
      _ => false,
    }
  }
}

pub fn pubkey(byte: u8) -> BlsPubkey {
  BlsPubkey::new([byte; 48])
}

pub fn validator(byte: u8) -> ProvisionedValidator {
  ProvisionedValidator {
    pubkey: pubkey(byte),
    share_data: HexBytes::new(vec![byte; 8]),
    encrypted_private_key: format!("encrypted-{byte}"),
  }
}

pub fn deposit(byte: u8) -> DepositDatum {
  DepositDatum {
    pubkey: pubkey(byte),
    signature: HexBytes::new(vec![byte; DepositDatum::SIGNATURE_LEN]),
    deposit_data_root: HexBytes::new(vec![byte; DepositDatum::ROOT_LEN]),
  }
}

pub fn registration_for(validators: &[ProvisionedValidator]) -> serde_json::Value {
  let params = RegistrationParams {
    pubkeys: validators.iter().map(|v| v.pubkey).collect(),
    operator_ids: OPERATOR_IDS.to_vec(),
    shares: validators.iter().map(|v| v.share_data.clone()).collect(),
    amount: 4_000_000_000_000_000_000,
    cluster: ClusterInfo {
      validator_count: 0,
      network_fee_index: 0,
      index: 0,
      active: true,
      balance: 0,
    },
  };
  serde_json::to_value(params).unwrap()
}

// Provisioning service

pub struct FakeProvisioner {
  pub validators: Vec<ProvisionedValidator>,
  /// Status polls answered "not ready" before the first "ready".
  pub ready_after: u32,
  pub creates: Mutex<Vec<CreateRequest>>,
  pub status_calls: Mutex<u32>,
  pub deposit_calls: Mutex<u32>,
  pub failpoints: Failpoints,
}

impl FakeProvisioner {
  pub fn new(validators: Vec<ProvisionedValidator>, ready_after: u32) -> Self {
    Self {
      validators,
      ready_after,
      creates: Mutex::new(Vec::new()),
      status_calls: Mutex::new(0),
      deposit_calls: Mutex::new(0),
      failpoints: Failpoints::default(),
    }
  }

  pub fn create_count(&self) -> usize {
    self.creates.lock().unwrap().len()
  }

  fn injected(&self, op: &'static str) -> Result<(), ProvisionerError> {
    if self.failpoints.take(op) {
      return Err(ProvisionerError::Api {
        status: 400,
        body: format!("injected failure in {op}"),
      });
    }
    Ok(())
  }
}

#[async_trait]
impl ProvisioningApi for FakeProvisioner {
  async fn create(&self, request: &CreateRequest) -> Result<CorrelationId, ProvisionerError> {
    self.injected("create")?;
    self.creates.lock().unwrap().push(request.clone());
    Ok(CorrelationId::new(CORRELATION_ID))
  }

  async fn status(&self, _id: &CorrelationId) -> Result<StatusReport, ProvisionerError> {
    self.injected("status")?;
    let mut calls = self.status_calls.lock().unwrap();
    *calls += 1;

    if *calls <= self.ready_after {
      return Ok(StatusReport {
        ready: false,
        validators: Vec::new(),
        registration: None,
      });
    }
    Ok(StatusReport {
      ready: true,
      validators: self.validators.clone(),
      registration: Some(registration_for(&self.validators)),
    })
  }

  async fn deposit_data(&self, _id: &CorrelationId) -> Result<DepositDataReport, ProvisionerError> {
    self.injected("deposit_data")?;
    *self.deposit_calls.lock().unwrap() += 1;
    Ok(DepositDataReport {
      ready: true,
      deposit_data: self.validators.iter().map(|v| deposit(v.pubkey.as_bytes()[0])).collect(),
    })
  }
}

// Staking contract

pub struct FakeContract {
  pub paused: Mutex<bool>,
  pub asset_balance: Mutex<u128>,
  pub stake_threshold: Mutex<u128>,
  pub stake_tally: Mutex<u128>,
  pub statuses: Mutex<HashMap<BlsPubkey, ValidatorStatus>>,
  pub registrations: Mutex<Vec<RegistrationParams>>,
  pub stakes: Mutex<Vec<Vec<DepositDatum>>>,
  pub revert: Mutex<bool>,
  pub failpoints: Failpoints,
  pending: Mutex<HashMap<TxRef, Vec<(BlsPubkey, ValidatorStatus)>>>,
}

impl FakeContract {
  /// Unpaused, with room for `validators` deposits.
  pub fn with_capacity(validators: u128) -> Self {
    Self {
      paused: Mutex::new(false),
      asset_balance: Mutex::new(validators * VALIDATOR_DEPOSIT),
      stake_threshold: Mutex::new(1_000 * VALIDATOR_DEPOSIT),
      stake_tally: Mutex::new(0),
      statuses: Mutex::new(HashMap::new()),
      registrations: Mutex::new(Vec::new()),
      stakes: Mutex::new(Vec::new()),
      revert: Mutex::new(false),
      failpoints: Failpoints::default(),
      pending: Mutex::new(HashMap::new()),
    }
  }

  pub fn set_status(&self, pubkey: BlsPubkey, status: ValidatorStatus) {
    self.statuses.lock().unwrap().insert(pubkey, status);
  }

  pub fn status_of(&self, pubkey: &BlsPubkey) -> ValidatorStatus {
    self
      .statuses
      .lock()
      .unwrap()
      .get(pubkey)
      .copied()
      .unwrap_or(ValidatorStatus::NotRegistered)
  }

  pub fn register_count(&self) -> usize {
    self.registrations.lock().unwrap().len()
  }

  pub fn stake_count(&self) -> usize {
    self.stakes.lock().unwrap().len()
  }

  fn injected(&self, op: &'static str) -> Result<(), ChainError> {
    if self.failpoints.take(op) {
      return Err(ChainError::rpc(format!("injected failure in {op}")));
    }
    Ok(())
  }

  fn broadcast(&self, prefix: &str, effects: Vec<(BlsPubkey, ValidatorStatus)>) -> TxRef {
    let mut pending = self.pending.lock().unwrap();
    let tx = TxRef::new(format!("0x{prefix}{:02x}", pending.len()));
    pending.insert(tx.clone(), effects);
    tx
  }
}

#[async_trait]
impl StakingContractClient for FakeContract {
  async fn paused(&self) -> Result<bool, ChainError> {
    self.injected("paused")?;
    Ok(*self.paused.lock().unwrap())
  }

  async fn asset_balance(&self) -> Result<u128, ChainError> {
    Ok(*self.asset_balance.lock().unwrap())
  }

  async fn stake_threshold(&self) -> Result<u128, ChainError> {
    Ok(*self.stake_threshold.lock().unwrap())
  }

  async fn stake_tally(&self) -> Result<u128, ChainError> {
    Ok(*self.stake_tally.lock().unwrap())
  }

  async fn validator_state(&self, pubkey: &BlsPubkey) -> Result<ValidatorStatus, ChainError> {
    self.injected("validator_state")?;
    Ok(self.status_of(pubkey))
  }

  async fn register_validators(&self, params: &RegistrationParams) -> Result<TxRef, ChainError> {
    self.injected("register_validators")?;
    self.registrations.lock().unwrap().push(params.clone());
    let effects = params
      .pubkeys
      .iter()
      .map(|pk| (*pk, ValidatorStatus::Registered))
      .collect();
    Ok(self.broadcast("aa", effects))
  }

  async fn stake_validators(&self, deposits: &[DepositDatum]) -> Result<TxRef, ChainError> {
    self.injected("stake_validators")?;
    self.stakes.lock().unwrap().push(deposits.to_vec());
    let effects = deposits
      .iter()
      .map(|d| (d.pubkey, ValidatorStatus::Staked))
      .collect();
    Ok(self.broadcast("bb", effects))
  }

  async fn wait_for_receipt(&self, tx: &TxRef) -> Result<TxReceipt, ChainError> {
    self.injected("wait_for_receipt")?;
    let success = !*self.revert.lock().unwrap();
    if success {
      let effects = self.pending.lock().unwrap().remove(tx).unwrap_or_default();
      let mut statuses = self.statuses.lock().unwrap();
      for (pubkey, status) in effects {
        statuses.insert(pubkey, status);
      }
    }
    Ok(TxReceipt {
      tx: tx.clone(),
      block_number: 100,
      success,
    })
  }
}

// Deposit contract logs

pub struct FakeDepositLogs {
  pub latest: u64,
  pub logs: Mutex<Vec<DepositLog>>,
}

impl FakeDepositLogs {
  pub fn empty() -> Self {
    Self {
      latest: 10_000,
      logs: Mutex::new(Vec::new()),
    }
  }

  pub fn add_deposit(&self, pubkey: BlsPubkey, block_number: u64) {
    let event = DepositEvent {
      pubkey,
      withdrawal_credentials: [0xee; 32],
      amount_gwei: 32_000_000_000,
      signature: [0x11; 96],
      index: 7,
    };
    self.logs.lock().unwrap().push(DepositLog {
      block_number,
      data: event.encode(),
    });
  }
}

#[async_trait]
impl DepositLogSource for FakeDepositLogs {
  async fn latest_block(&self) -> Result<u64, ChainError> {
    Ok(self.latest)
  }

  async fn deposit_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<DepositLog>, ChainError> {
    Ok(
      self
        .logs
        .lock()
        .unwrap()
        .iter()
        .filter(|log| (from_block..=to_block).contains(&log.block_number))
        .cloned()
        .collect(),
    )
  }
}

// Key escrow

#[derive(Default)]
pub struct FakeEscrow {
  pub keys: Mutex<HashMap<BlsPubkey, String>>,
  pub failing: Mutex<bool>,
}

#[async_trait]
impl KeyEscrow for FakeEscrow {
  async fn store(&self, pubkey: &BlsPubkey, encrypted_private_key: &str) -> Result<(), EscrowError> {
    if *self.failing.lock().unwrap() {
      return Err(EscrowError::NotFound(*pubkey));
    }
    self
      .keys
      .lock()
      .unwrap()
      .insert(*pubkey, encrypted_private_key.to_string());
    Ok(())
  }

  async fn fetch(&self, pubkey: &BlsPubkey) -> Result<EscrowRecord, EscrowError> {
    let keys = self.keys.lock().unwrap();
    let encrypted_private_key = keys.get(pubkey).cloned().ok_or(EscrowError::NotFound(*pubkey))?;
    Ok(EscrowRecord {
      pubkey: *pubkey,
      encrypted_private_key,
    })
  }
}

// Harness

pub fn saga_config() -> SagaConfig {
  SagaConfig {
    withdrawal_address: format!("0x{}", "a".repeat(40)),
    fee_recipient: format!("0x{}", "b".repeat(40)),
    operator_ids: OPERATOR_IDS.to_vec(),
    poll: PollConfig::immediate(20),
    error_threshold: 5,
    front_run_window_blocks: 1000,
    unit_stake: VALIDATOR_DEPOSIT,
    registration_amount_override: None,
    recover_correlation_id: None,
  }
}

pub struct Harness {
  pub provisioner: Arc<FakeProvisioner>,
  pub contract: Arc<FakeContract>,
  pub deposit_logs: Arc<FakeDepositLogs>,
  pub escrow: Arc<FakeEscrow>,
  pub store: Arc<dyn StateStore>,
  pub config: SagaConfig,
}

impl Harness {
  /// Two validators, ready after two polls, capacity for ten.
  pub fn new() -> Self {
    Self::with_validators(vec![validator(1), validator(2)], 2)
  }

  pub fn with_validators(validators: Vec<ProvisionedValidator>, ready_after: u32) -> Self {
    Self {
      provisioner: Arc::new(FakeProvisioner::new(validators, ready_after)),
      contract: Arc::new(FakeContract::with_capacity(10)),
      deposit_logs: Arc::new(FakeDepositLogs::empty()),
      escrow: Arc::new(FakeEscrow::default()),
      store: Arc::new(InMemoryStateStore::new()),
      config: saga_config(),
    }
  }

  pub fn collaborators(&self) -> Collaborators {
    Collaborators {
      provisioner: self.provisioner.clone(),
      contract: self.contract.clone(),
      deposit_logs: self.deposit_logs.clone(),
      escrow: self.escrow.clone(),
      store: self.store.clone(),
    }
  }

  /// A fresh saga over the same collaborators, as a restarted process would build.
  pub fn saga(&self) -> ValidatorProvisioningSaga<NoopNotifier> {
    ValidatorProvisioningSaga::new(self.collaborators(), self.config.clone())
  }

  pub fn saga_with<N: SagaNotifier>(&self, notifier: N) -> ValidatorProvisioningSaga<N> {
    ValidatorProvisioningSaga::with_notifier(self.collaborators(), self.config.clone(), notifier)
  }
}
