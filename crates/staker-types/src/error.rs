use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
  #[error("invalid hex: {0}")]
  Hex(#[from] hex::FromHexError),

  #[error("invalid length for {field}: expected {expected} bytes, got {actual}")]
  Length {
    field: &'static str,
    expected: usize,
    actual: usize,
  },

  #[error("unknown validator status index: {0}")]
  UnknownStatus(u8),

  #[error("invalid registration params: {message}")]
  Registration { message: String },

  #[error("malformed registration params: {0}")]
  Json(#[from] serde_json::Error),
}

impl TypesError {
  pub(crate) fn registration(message: impl Into<String>) -> Self {
    Self::Registration {
      message: message.into(),
    }
  }
}
