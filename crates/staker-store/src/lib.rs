//! Staker Store
//!
//! This crate provides the key-value storage trait used as crash-recovery
//! memory by the provisioning saga, plus two implementations:
//! - [`InMemoryStateStore`] for tests and single-process use
//! - [`SqliteStateStore`] for durable storage across restarts
//!
//! Values are opaque strings; callers own the serialization format.

mod memory;
mod sqlite;

pub use memory::InMemoryStateStore;
pub use sqlite::SqliteStateStore;

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),
}

/// Durable key-value storage.
///
/// Implementations must make a completed `put` or `delete` visible to every
/// later `get`, including after a process restart for durable backends.
#[async_trait]
pub trait StateStore: Send + Sync {
  /// Get a value by key.
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Insert or replace a value.
  async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

  /// Delete a value. Deleting a missing key is not an error.
  async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
