//! Staker Config
//!
//! Serializable configuration for the validator provisioning saga and the
//! adapters it talks to. Configuration is loaded from a JSON file; every field
//! that has an operational default can be omitted.
//!
//! ```json
//! {
//!   "saga": {
//!     "withdrawal_address": "0x...",
//!     "fee_recipient": "0x...",
//!     "operator_ids": [1, 2, 3, 4]
//!   },
//!   "provisioner": { "base_url": "https://provisioner.example" }
//! }
//! ```

mod error;
mod poll;
mod saga;

pub use error::ConfigError;
pub use poll::PollConfig;
pub use saga::SagaConfig;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakerConfig {
  pub saga: SagaConfig,
  pub provisioner: ProvisionerConfig,
  #[serde(default)]
  pub escrow: EscrowConfig,
}

/// Connection settings for the validator provisioning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionerConfig {
  pub base_url: String,
  /// Name of the environment variable holding the API token.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_key_env: Option<String>,
}

/// Where encrypted validator keys are escrowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscrowConfig {
  /// Directory for escrowed keystores. Defaults to `{data_dir}/escrow`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dir: Option<PathBuf>,
}

impl ProvisionerConfig {
  /// Resolve the API token from the environment.
  ///
  /// `Ok(None)` when no variable is configured. A configured variable that is
  /// unset or not unicode is an error rather than an anonymous client.
  pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
    let Some(name) = &self.api_key_env else {
      return Ok(None);
    };
    match std::env::var(name) {
      Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
      Ok(_) => Err(ConfigError::invalid(
        "provisioner.api_key_env",
        format!("environment variable {name} is empty"),
      )),
      Err(e) => Err(ConfigError::invalid(
        "provisioner.api_key_env",
        format!("environment variable {name}: {e}"),
      )),
    }
  }
}

impl EscrowConfig {
  /// The escrow directory, falling back to `{data_dir}/escrow`.
  pub fn resolve_dir(&self, data_dir: &Path) -> PathBuf {
    match &self.dir {
      Some(dir) => dir.clone(),
      None => data_dir.join("escrow"),
    }
  }
}

impl StakerConfig {
  /// Parse and validate a JSON configuration document.
  pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Read, parse and validate a JSON configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json_str(&content)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.provisioner.base_url.trim().is_empty() {
      return Err(ConfigError::invalid("provisioner.base_url", "must not be empty"));
    }
    self.saga.validate()
  }
}
