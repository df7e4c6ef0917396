//! Saga events and notifiers for observability.
//!
//! The saga emits an event whenever the workflow moves, fails or is cleared,
//! so a host can persist an audit trail, page someone on abandonment, etc.

use serde::{Deserialize, Serialize};
use staker_types::CorrelationId;
use tokio::sync::mpsc;

use crate::state::PhaseKind;

/// Why the slot was emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
  /// Deposits confirmed.
  Completed,
  /// The batch turned out to be staked or exited already.
  AlreadyStaked,
  /// An operator reset the workflow.
  Operator,
}

/// Events emitted by the saga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SagaEvent {
  PhaseAdvanced {
    correlation_id: CorrelationId,
    from: Option<PhaseKind>,
    to: PhaseKind,
  },

  /// A failure was charged to the attempt.
  FailureRecorded {
    correlation_id: CorrelationId,
    error_count: u32,
    error: String,
  },

  /// The attempt hit the error threshold and was dropped.
  Abandoned {
    correlation_id: CorrelationId,
    error_count: u32,
    error: String,
  },

  Cleared {
    correlation_id: CorrelationId,
    reason: ClearReason,
  },
}

/// Receives saga events.
pub trait SagaNotifier: Send + Sync {
  fn notify(&self, event: SagaEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl SagaNotifier for NoopNotifier {
  fn notify(&self, _event: SagaEvent) {}
}

/// Sends events to an unbounded channel.
///
/// Volume is a handful of events per invocation, so the channel is unbounded
/// to keep the saga from ever waiting on a slow consumer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<SagaEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<SagaEvent>) -> Self {
    Self { sender }
  }
}

impl SagaNotifier for ChannelNotifier {
  fn notify(&self, event: SagaEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_channel_notifier_delivers() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let notifier = ChannelNotifier::new(tx);

    notifier.notify(SagaEvent::Cleared {
      correlation_id: CorrelationId::new("abc"),
      reason: ClearReason::Operator,
    });

    let event = rx.try_recv().unwrap();
    assert!(matches!(
      event,
      SagaEvent::Cleared {
        reason: ClearReason::Operator,
        ..
      }
    ));
  }

  #[test]
  fn test_send_after_receiver_dropped_is_ignored() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    ChannelNotifier::new(tx).notify(SagaEvent::Cleared {
      correlation_id: CorrelationId::new("abc"),
      reason: ClearReason::Completed,
    });
  }
}
