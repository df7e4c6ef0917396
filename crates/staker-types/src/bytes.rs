use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Arbitrary bytes carried as a `0x`-prefixed hex string.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
  pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
    Self(bytes.into())
  }

  /// Parse hex with or without a `0x` prefix.
  pub fn from_hex(s: &str) -> Result<Self, TypesError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    Ok(Self(hex::decode(trimmed)?))
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn to_hex(&self) -> String {
    format!("0x{}", hex::encode(&self.0))
  }
}

impl fmt::Debug for HexBytes {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "HexBytes({})", self.to_hex())
  }
}

impl Serialize for HexBytes {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.to_hex())
  }
}

impl<'de> Deserialize<'de> for HexBytes {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    Self::from_hex(&s).map_err(serde::de::Error::custom)
  }
}
