use thiserror::Error;

/// Errors talking to the provisioning service.
#[derive(Debug, Error)]
pub enum ProvisionerError {
  /// Transport-level failure (connect, timeout, body read).
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The service answered with a non-success status.
  #[error("provisioning service returned {status}: {body}")]
  Api { status: u16, body: String },

  /// The response body did not match the expected shape.
  #[error("invalid response from provisioning service: {message}")]
  InvalidResponse { message: String },

  /// The adapter could not be built from its configuration.
  #[error("provisioner config: {0}")]
  Config(#[from] staker_config::ConfigError),

  /// The configured base URL cannot be used.
  #[error("invalid provisioning service url: {0}")]
  Url(#[from] url::ParseError),

  /// The request never became ready within the poll budget.
  #[error("{operation} not ready after {attempts} attempts")]
  Exhausted {
    operation: &'static str,
    attempts: u32,
    #[source]
    last_error: Option<Box<ProvisionerError>>,
  },
}

impl ProvisionerError {
  pub fn invalid_response(message: impl Into<String>) -> Self {
    Self::InvalidResponse {
      message: message.into(),
    }
  }

  /// Whether retrying the same call may succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Http(_) => true,
      Self::Api { status, .. } => *status == 429 || *status >= 500,
      Self::InvalidResponse { .. } | Self::Config(_) | Self::Url(_) | Self::Exhausted { .. } => false,
    }
  }
}
