use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier tying every step of one provisioning attempt together.
///
/// Issued by the provisioning service in response to a create request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  /// Fresh random identifier, used as the idempotency key of a create request.
  pub fn generate() -> Self {
    Self(uuid::Uuid::new_v4().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CorrelationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for CorrelationId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}
