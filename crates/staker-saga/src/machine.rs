//! Pure phase transitions.
//!
//! [`transition`] decides the next [`WorkflowState`] from the current one and
//! an observed [`Event`]. It performs no I/O; the saga carries out the
//! returned [`Effect`]s in order before acting on the new state.

use chrono::{DateTime, Utc};
use staker_types::{
  BlsPubkey, CorrelationId, DepositDatum, ProvisionedValidator, TxReceipt, TxRef, ValidatorBatch,
};
use thiserror::Error;

use crate::state::{Phase, PhaseKind, WorkflowState};

/// Something the saga observed that moves the workflow forward.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  /// The service accepted a creation request.
  CreationIssued {
    correlation_id: CorrelationId,
    requested: u32,
  },
  /// Keys, shares and registration params are available.
  CreationReady {
    validators: Vec<ProvisionedValidator>,
    registration: serde_json::Value,
  },
  RegistrationBroadcast { tx: TxRef },
  RegistrationMined { receipt: TxReceipt },
  /// A batch registered by an earlier process, rebuilt from the service.
  Recovered {
    correlation_id: CorrelationId,
    validators: Vec<ProvisionedValidator>,
  },
  DepositDataReady { deposits: Vec<DepositDatum> },
  DepositBroadcast { tx: TxRef },
  DepositMined { receipt: TxReceipt },
}

impl Event {
  pub fn name(&self) -> &'static str {
    match self {
      Self::CreationIssued { .. } => "creation_issued",
      Self::CreationReady { .. } => "creation_ready",
      Self::RegistrationBroadcast { .. } => "registration_broadcast",
      Self::RegistrationMined { .. } => "registration_mined",
      Self::Recovered { .. } => "recovered",
      Self::DepositDataReady { .. } => "deposit_data_ready",
      Self::DepositBroadcast { .. } => "deposit_broadcast",
      Self::DepositMined { .. } => "deposit_mined",
    }
  }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
  /// Write the new state to the slot.
  Persist(WorkflowState),
  /// Empty the slot.
  Clear,
  /// Hand encrypted keys to escrow. Failures here are not fatal.
  EscrowKeys(Vec<ProvisionedValidator>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
  pub state: WorkflowState,
  pub effects: Vec<Effect>,
}

#[derive(Debug, Error)]
pub enum TransitionError {
  #[error("event '{event}' is not valid in phase {}", display_phase(.phase))]
  Unexpected {
    phase: Option<PhaseKind>,
    event: &'static str,
  },

  #[error("invalid '{event}' event: {message}")]
  Invalid { event: &'static str, message: String },
}

fn display_phase(phase: &Option<PhaseKind>) -> String {
  match phase {
    Some(kind) => kind.to_string(),
    None => "<none>".to_string(),
  }
}

fn invalid(event: &'static str, message: impl Into<String>) -> TransitionError {
  TransitionError::Invalid {
    event,
    message: message.into(),
  }
}

/// Compute the successor of `current` under `event`.
///
/// A new workflow can only start from an empty slot, and every accepted
/// event moves the phase strictly forward.
pub fn transition(
  current: Option<&WorkflowState>,
  event: Event,
  now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
  let name = event.name();

  let Some(current) = current else {
    return start(event, now);
  };

  let phase = match (&current.phase, event) {
    (Phase::CreationIssued { requested }, Event::CreationReady { validators, registration }) => {
      if validators.len() != *requested as usize {
        return Err(invalid(
          name,
          format!("requested {requested} validators, service returned {}", validators.len()),
        ));
      }
      let batch = ValidatorBatch::new(validators.clone()).map_err(|e| invalid(name, e.to_string()))?;
      let state = advance(current, Phase::CreationConfirmed { batch, registration }, now);
      return Ok(Transition {
        effects: vec![Effect::Persist(state.clone()), Effect::EscrowKeys(validators)],
        state,
      });
    }

    (Phase::CreationConfirmed { batch, registration }, Event::RegistrationBroadcast { tx }) => {
      Phase::RegisterBroadcast {
        batch: batch.clone(),
        registration: registration.clone(),
        tx,
      }
    }

    (Phase::RegisterBroadcast { batch, tx, .. }, Event::RegistrationMined { receipt }) => {
      check_receipt(name, tx, &receipt)?;
      Phase::Registered { batch: batch.clone() }
    }

    (Phase::Registered { batch }, Event::DepositDataReady { deposits }) => Phase::DepositDataGot {
      batch: batch.clone(),
      deposits: align_deposits(name, batch, deposits)?,
    },

    (Phase::DepositDataGot { batch, deposits }, Event::DepositBroadcast { tx }) => {
      Phase::DepositBroadcast {
        batch: batch.clone(),
        deposits: deposits.clone(),
        tx,
      }
    }

    (Phase::DepositBroadcast { batch, tx, .. }, Event::DepositMined { receipt }) => {
      check_receipt(name, tx, &receipt)?;
      let state = advance(current, Phase::DepositConfirmed { batch: batch.clone() }, now);
      return Ok(Transition {
        state,
        effects: vec![Effect::Clear],
      });
    }

    (phase, _) => {
      return Err(TransitionError::Unexpected {
        phase: Some(phase.kind()),
        event: name,
      });
    }
  };

  let state = advance(current, phase, now);
  Ok(Transition {
    effects: vec![Effect::Persist(state.clone())],
    state,
  })
}

fn start(event: Event, now: DateTime<Utc>) -> Result<Transition, TransitionError> {
  let name = event.name();
  let (correlation_id, phase) = match event {
    Event::CreationIssued {
      correlation_id,
      requested,
    } => {
      if requested == 0 {
        return Err(invalid(name, "at least one validator must be requested"));
      }
      (correlation_id, Phase::CreationIssued { requested })
    }
    Event::Recovered {
      correlation_id,
      validators,
    } => {
      let batch = ValidatorBatch::new(validators).map_err(|e| invalid(name, e.to_string()))?;
      (correlation_id, Phase::Registered { batch })
    }
    _ => {
      return Err(TransitionError::Unexpected {
        phase: None,
        event: name,
      });
    }
  };

  let state = WorkflowState {
    correlation_id,
    phase,
    error_count: 0,
    updated_at: now,
  };
  Ok(Transition {
    effects: vec![Effect::Persist(state.clone())],
    state,
  })
}

fn advance(current: &WorkflowState, phase: Phase, now: DateTime<Utc>) -> WorkflowState {
  WorkflowState {
    correlation_id: current.correlation_id.clone(),
    phase,
    error_count: current.error_count,
    updated_at: now,
  }
}

fn check_receipt(event: &'static str, expected: &TxRef, receipt: &TxReceipt) -> Result<(), TransitionError> {
  if &receipt.tx != expected {
    return Err(invalid(
      event,
      format!("receipt is for {}, expected {expected}", receipt.tx),
    ));
  }
  if !receipt.success {
    return Err(invalid(event, format!("transaction {expected} reverted")));
  }
  Ok(())
}

/// Validate deposit data and put it in batch order, one datum per validator.
fn align_deposits(
  event: &'static str,
  batch: &ValidatorBatch,
  mut deposits: Vec<DepositDatum>,
) -> Result<Vec<DepositDatum>, TransitionError> {
  if deposits.len() != batch.len() {
    return Err(invalid(
      event,
      format!("expected {} deposits, got {}", batch.len(), deposits.len()),
    ));
  }

  let mut aligned = Vec::with_capacity(batch.len());
  for pubkey in batch.pubkeys() {
    let position = deposits
      .iter()
      .position(|d| d.pubkey == pubkey)
      .ok_or_else(|| missing_deposit(event, &pubkey))?;
    let datum = deposits.swap_remove(position);
    datum.validate().map_err(|e| invalid(event, e.to_string()))?;
    aligned.push(datum);
  }
  Ok(aligned)
}

fn missing_deposit(event: &'static str, pubkey: &BlsPubkey) -> TransitionError {
  invalid(event, format!("no deposit data for {pubkey}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use staker_types::HexBytes;

  fn pubkey(byte: u8) -> BlsPubkey {
    BlsPubkey::new([byte; 48])
  }

  fn validator(byte: u8) -> ProvisionedValidator {
    ProvisionedValidator {
      pubkey: pubkey(byte),
      share_data: HexBytes::new(vec![byte; 4]),
      encrypted_private_key: format!("enc-{byte}"),
    }
  }

  fn deposit(byte: u8) -> DepositDatum {
    DepositDatum {
      pubkey: pubkey(byte),
      signature: HexBytes::new(vec![byte; DepositDatum::SIGNATURE_LEN]),
      deposit_data_root: HexBytes::new(vec![byte; DepositDatum::ROOT_LEN]),
    }
  }

  fn receipt(tx: &str, success: bool) -> TxReceipt {
    TxReceipt {
      tx: TxRef::new(tx),
      block_number: 10,
      success,
    }
  }

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
  }

  fn step(state: Option<&WorkflowState>, event: Event) -> Transition {
    transition(state, event, now()).unwrap()
  }

  fn registered(bytes: &[u8]) -> WorkflowState {
    step(
      None,
      Event::Recovered {
        correlation_id: CorrelationId::new("abc"),
        validators: bytes.iter().copied().map(validator).collect(),
      },
    )
    .state
  }

  #[test]
  fn test_full_forward_path() {
    let issued = step(
      None,
      Event::CreationIssued {
        correlation_id: CorrelationId::new("abc"),
        requested: 2,
      },
    );
    assert_eq!(issued.state.kind(), PhaseKind::CreationIssued);
    assert_eq!(issued.effects, vec![Effect::Persist(issued.state.clone())]);

    let confirmed = step(
      Some(&issued.state),
      Event::CreationReady {
        validators: vec![validator(1), validator(2)],
        registration: serde_json::json!({"amount": "1"}),
      },
    );
    assert_eq!(confirmed.state.kind(), PhaseKind::CreationConfirmed);
    assert!(matches!(&confirmed.effects[1], Effect::EscrowKeys(v) if v.len() == 2));

    let broadcast = step(
      Some(&confirmed.state),
      Event::RegistrationBroadcast { tx: TxRef::new("0x01") },
    );
    let registered = step(
      Some(&broadcast.state),
      Event::RegistrationMined {
        receipt: receipt("0x01", true),
      },
    );
    assert_eq!(registered.state.kind(), PhaseKind::Registered);

    let got = step(
      Some(&registered.state),
      Event::DepositDataReady {
        deposits: vec![deposit(1), deposit(2)],
      },
    );
    let deposit_broadcast = step(Some(&got.state), Event::DepositBroadcast { tx: TxRef::new("0x02") });
    let done = step(
      Some(&deposit_broadcast.state),
      Event::DepositMined {
        receipt: receipt("0x02", true),
      },
    );

    assert_eq!(done.state.kind(), PhaseKind::DepositConfirmed);
    assert_eq!(done.effects, vec![Effect::Clear]);
    assert_eq!(done.state.correlation_id.as_str(), "abc");
  }

  #[test]
  fn test_creation_requires_empty_slot() {
    let state = registered(&[1]);
    let err = transition(
      Some(&state),
      Event::CreationIssued {
        correlation_id: CorrelationId::new("other"),
        requested: 1,
      },
      now(),
    )
    .unwrap_err();

    assert!(matches!(
      err,
      TransitionError::Unexpected {
        phase: Some(PhaseKind::Registered),
        event: "creation_issued"
      }
    ));
  }

  #[test]
  fn test_backward_event_rejected() {
    let state = registered(&[1]);
    let err = transition(
      Some(&state),
      Event::RegistrationBroadcast { tx: TxRef::new("0x01") },
      now(),
    )
    .unwrap_err();
    assert!(matches!(err, TransitionError::Unexpected { .. }));
  }

  #[test]
  fn test_error_count_carried_forward() {
    let mut state = registered(&[1]);
    state.error_count = 3;

    let next = step(
      Some(&state),
      Event::DepositDataReady {
        deposits: vec![deposit(1)],
      },
    );
    assert_eq!(next.state.error_count, 3);
  }

  #[test]
  fn test_creation_count_mismatch_rejected() {
    let issued = step(
      None,
      Event::CreationIssued {
        correlation_id: CorrelationId::new("abc"),
        requested: 3,
      },
    );
    let err = transition(
      Some(&issued.state),
      Event::CreationReady {
        validators: vec![validator(1)],
        registration: serde_json::Value::Null,
      },
      now(),
    )
    .unwrap_err();
    assert!(matches!(err, TransitionError::Invalid { .. }));
  }

  #[test]
  fn test_deposits_reordered_to_batch_order() {
    let state = registered(&[1, 2, 3]);
    let next = step(
      Some(&state),
      Event::DepositDataReady {
        deposits: vec![deposit(3), deposit(1), deposit(2)],
      },
    );

    let Phase::DepositDataGot { deposits, .. } = next.state.phase else {
      panic!("expected DepositDataGot");
    };
    let order: Vec<_> = deposits.iter().map(|d| d.pubkey).collect();
    assert_eq!(order, vec![pubkey(1), pubkey(2), pubkey(3)]);
  }

  #[test]
  fn test_deposit_for_unknown_key_rejected() {
    let state = registered(&[1]);
    let err = transition(
      Some(&state),
      Event::DepositDataReady {
        deposits: vec![deposit(9)],
      },
      now(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("no deposit data"));
  }

  #[test]
  fn test_receipt_for_other_tx_rejected() {
    let state = registered(&[1]);
    let got = step(
      Some(&state),
      Event::DepositDataReady {
        deposits: vec![deposit(1)],
      },
    );
    let broadcast = step(Some(&got.state), Event::DepositBroadcast { tx: TxRef::new("0xaa") });

    let err = transition(
      Some(&broadcast.state),
      Event::DepositMined {
        receipt: receipt("0xbb", true),
      },
      now(),
    )
    .unwrap_err();
    assert!(matches!(err, TransitionError::Invalid { .. }));
  }

  #[test]
  fn test_start_rejects_mid_workflow_event() {
    let err = transition(None, Event::DepositBroadcast { tx: TxRef::new("0x01") }, now()).unwrap_err();
    assert_eq!(err.to_string(), "event 'deposit_broadcast' is not valid in phase <none>");
  }
}
