use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// A BLS12-381 validator public key (compressed, 48 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlsPubkey([u8; BlsPubkey::LEN]);

impl BlsPubkey {
  pub const LEN: usize = 48;

  pub fn new(bytes: [u8; Self::LEN]) -> Self {
    Self(bytes)
  }

  pub fn from_slice(bytes: &[u8]) -> Result<Self, TypesError> {
    let array: [u8; Self::LEN] = bytes.try_into().map_err(|_| TypesError::Length {
      field: "pubkey",
      expected: Self::LEN,
      actual: bytes.len(),
    })?;
    Ok(Self(array))
  }

  pub fn as_bytes(&self) -> &[u8; Self::LEN] {
    &self.0
  }

  pub fn to_hex(&self) -> String {
    format!("0x{}", hex::encode(self.0))
  }
}

impl FromStr for BlsPubkey {
  type Err = TypesError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    Self::from_slice(&hex::decode(trimmed)?)
  }
}

impl fmt::Display for BlsPubkey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_hex())
  }
}

impl fmt::Debug for BlsPubkey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "BlsPubkey({})", self.to_hex())
  }
}

impl Serialize for BlsPubkey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_hex())
  }
}

impl<'de> Deserialize<'de> for BlsPubkey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}
