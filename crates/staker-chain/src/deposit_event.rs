//! Codec for the beacon deposit contract's log:
//!
//! ```text
//! event DepositEvent(bytes pubkey, bytes withdrawal_credentials, bytes amount,
//!                    bytes signature, bytes index)
//! ```
//!
//! Every field is ABI `bytes`, so the log data is five head words holding
//! offsets followed by length-prefixed, 32-byte padded tails. `amount` (gwei)
//! and `index` are 8-byte little-endian integers.

use staker_types::BlsPubkey;

use crate::error::ChainError;

const WORD: usize = 32;
const FIELDS: usize = 5;

const WITHDRAWAL_CREDENTIALS_LEN: usize = 32;
const SIGNATURE_LEN: usize = 96;

/// A raw log emitted by the deposit contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositLog {
  pub block_number: u64,
  pub data: Vec<u8>,
}

/// A decoded `DepositEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositEvent {
  pub pubkey: BlsPubkey,
  pub withdrawal_credentials: [u8; WITHDRAWAL_CREDENTIALS_LEN],
  pub amount_gwei: u64,
  pub signature: [u8; SIGNATURE_LEN],
  pub index: u64,
}

impl DepositEvent {
  /// Decode the data section of a `DepositEvent` log.
  pub fn decode(data: &[u8]) -> Result<Self, ChainError> {
    let pubkey = BlsPubkey::from_slice(read_bytes(data, 0)?)
      .map_err(|e| ChainError::decode("deposit pubkey", e.to_string()))?;

    Ok(Self {
      pubkey,
      withdrawal_credentials: fixed(read_bytes(data, 1)?, "withdrawal credentials")?,
      amount_gwei: u64::from_le_bytes(fixed(read_bytes(data, 2)?, "deposit amount")?),
      signature: fixed(read_bytes(data, 3)?, "deposit signature")?,
      index: u64::from_le_bytes(fixed(read_bytes(data, 4)?, "deposit index")?),
    })
  }

  /// Encode as log data, in the layout the deposit contract emits.
  pub fn encode(&self) -> Vec<u8> {
    let amount = self.amount_gwei.to_le_bytes();
    let index = self.index.to_le_bytes();
    let fields: [&[u8]; FIELDS] = [
      self.pubkey.as_bytes(),
      &self.withdrawal_credentials,
      &amount,
      &self.signature,
      &index,
    ];

    let mut head = Vec::with_capacity(FIELDS * WORD);
    let mut tail = Vec::new();

    for field in fields {
      head.extend_from_slice(&usize_word(FIELDS * WORD + tail.len()));
      tail.extend_from_slice(&usize_word(field.len()));
      tail.extend_from_slice(field);
      tail.resize(tail.len() + padding(field.len()), 0);
    }

    head.extend_from_slice(&tail);
    head
  }
}

/// Read the dynamic `bytes` field whose offset sits in head word `field`.
fn read_bytes(data: &[u8], field: usize) -> Result<&[u8], ChainError> {
  let offset = read_usize(data, field * WORD)?;
  let len = read_usize(data, offset)?;
  let start = offset
    .checked_add(WORD)
    .ok_or_else(|| ChainError::decode("deposit log", "offset overflow"))?;
  let end = start
    .checked_add(len)
    .ok_or_else(|| ChainError::decode("deposit log", "length overflow"))?;

  data
    .get(start..end)
    .ok_or_else(|| ChainError::decode("deposit log", format!("field {} out of bounds", field)))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize, ChainError> {
  let word = at
    .checked_add(WORD)
    .and_then(|end| data.get(at..end))
    .ok_or_else(|| ChainError::decode("deposit log", format!("truncated at byte {}", at)))?;

  let (high, low) = word.split_at(WORD - 8);
  if high.iter().any(|b| *b != 0) {
    return Err(ChainError::decode("deposit log", "offset does not fit in 64 bits"));
  }

  let mut buf = [0u8; 8];
  buf.copy_from_slice(low);
  usize::try_from(u64::from_be_bytes(buf))
    .map_err(|_| ChainError::decode("deposit log", "offset does not fit in usize"))
}

fn fixed<const N: usize>(bytes: &[u8], what: &'static str) -> Result<[u8; N], ChainError> {
  bytes
    .try_into()
    .map_err(|_| ChainError::decode(what, format!("expected {} bytes, got {}", N, bytes.len())))
}

fn usize_word(value: usize) -> [u8; WORD] {
  let mut word = [0u8; WORD];
  word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
  word
}

fn padding(len: usize) -> usize {
  (WORD - len % WORD) % WORD
}
