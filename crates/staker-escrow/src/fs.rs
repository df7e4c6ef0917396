use std::path::{Path, PathBuf};

use async_trait::async_trait;
use staker_config::EscrowConfig;
use staker_types::BlsPubkey;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::{EscrowError, EscrowRecord, KeyEscrow};

/// Filesystem-based key escrow.
///
/// Each key is stored at `{base_path}/{0xpubkey}.json`. The base directory is
/// created on first write. Writes go through a temp file and a rename so a
/// crash never leaves a truncated record behind.
pub struct FsKeyEscrow {
  base_path: PathBuf,
}

impl FsKeyEscrow {
  /// Create a new filesystem escrow rooted at the given path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  /// Create the escrow configured by `config`, rooted under `data_dir` unless
  /// the config names its own directory.
  pub fn from_config(config: &EscrowConfig, data_dir: &Path) -> Self {
    Self::new(config.resolve_dir(data_dir))
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn key_to_path(&self, pubkey: &BlsPubkey) -> PathBuf {
    self.base_path.join(format!("{}.json", pubkey.to_hex()))
  }
}

#[async_trait]
impl KeyEscrow for FsKeyEscrow {
  async fn store(&self, pubkey: &BlsPubkey, encrypted_private_key: &str) -> Result<(), EscrowError> {
    let record = EscrowRecord {
      pubkey: *pubkey,
      encrypted_private_key: encrypted_private_key.to_string(),
    };
    let data = record.to_bytes()?;

    fs::create_dir_all(&self.base_path).await?;

    let path = self.key_to_path(pubkey);
    let tmp_path = path.with_extension("json.tmp");

    let mut file = File::create(&tmp_path).await?;
    file.write_all(&data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp_path, &path).await?;
    Ok(())
  }

  async fn fetch(&self, pubkey: &BlsPubkey) -> Result<EscrowRecord, EscrowError> {
    let path = self.key_to_path(pubkey);
    let data = fs::read(&path).await.map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        EscrowError::NotFound(*pubkey)
      } else {
        EscrowError::Io(e)
      }
    })?;
    EscrowRecord::from_bytes(&data)
  }
}
