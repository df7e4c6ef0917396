use thiserror::Error;

/// Errors from on-chain reads, writes and log decoding.
#[derive(Debug, Error)]
pub enum ChainError {
  /// The node rejected or failed the call.
  #[error("rpc error: {message}")]
  Rpc { message: String },

  /// The transaction could not be broadcast.
  #[error("failed to broadcast transaction: {message}")]
  Broadcast { message: String },

  /// Returned data did not decode.
  #[error("failed to decode {what}: {message}")]
  Decode { what: &'static str, message: String },
}

impl ChainError {
  pub fn rpc(message: impl Into<String>) -> Self {
    Self::Rpc {
      message: message.into(),
    }
  }

  pub fn broadcast(message: impl Into<String>) -> Self {
    Self::Broadcast {
      message: message.into(),
    }
  }

  pub(crate) fn decode(what: &'static str, message: impl Into<String>) -> Self {
    Self::Decode {
      what,
      message: message.into(),
    }
  }
}
