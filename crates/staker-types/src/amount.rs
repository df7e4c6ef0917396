//! Serde helpers for `u128` amounts.
//!
//! Amounts are written as decimal strings so that values above `u64::MAX`
//! survive JSON consumers that only handle doubles. Both decimal strings and
//! JSON integers are accepted on input.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Funding {
//!   #[serde(with = "staker_types::amount")]
//!   amount: u128,
//! }
//! ```

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_str(&value.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
  deserializer.deserialize_any(AmountVisitor)
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
  type Value = u128;

  fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("a non-negative integer or decimal string")
  }

  fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
    Ok(u128::from(v))
  }

  fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
    Ok(v)
  }

  fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
    u128::try_from(v).map_err(|_| E::custom(format!("negative amount: {}", v)))
  }

  fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
    v.trim()
      .parse()
      .map_err(|_| E::custom(format!("invalid amount: {:?}", v)))
  }
}

/// Same encoding for `Option<u128>`; `null` and a missing field map to `None`.
pub mod option {
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
      Some(v) => super::serialize(v, serializer),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u128>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(with = "super")] u128);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(v)| v))
  }
}

#[cfg(test)]
mod tests {
  use serde::{Deserialize, Serialize};

  #[derive(Debug, PartialEq, Serialize, Deserialize)]
  struct Funding {
    #[serde(with = "super")]
    amount: u128,
    #[serde(default, with = "super::option")]
    cap: Option<u128>,
  }

  #[test]
  fn test_accepts_string_and_number() {
    let from_str: Funding = serde_json::from_str(r#"{"amount": "32000000000000000000"}"#).unwrap();
    assert_eq!(from_str.amount, 32_000_000_000_000_000_000);
    assert_eq!(from_str.cap, None);

    let from_num: Funding = serde_json::from_str(r#"{"amount": 42, "cap": 7}"#).unwrap();
    assert_eq!(from_num.amount, 42);
    assert_eq!(from_num.cap, Some(7));
  }

  #[test]
  fn test_writes_decimal_string() {
    let json = serde_json::to_value(Funding {
      amount: 5,
      cap: None,
    })
    .unwrap();
    assert_eq!(json["amount"], "5");
    assert!(json["cap"].is_null());
  }

  #[test]
  fn test_rejects_negative() {
    assert!(serde_json::from_str::<Funding>(r#"{"amount": -1}"#).is_err());
    assert!(serde_json::from_str::<Funding>(r#"{"amount": "ten"}"#).is_err());
  }
}
