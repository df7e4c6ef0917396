use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{StateStore, StoreError};

/// In-memory store implementation.
///
/// Suitable for testing; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
  data: RwLock<HashMap<String, String>>,
}

impl InMemoryStateStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.data.read().await.get(key).cloned())
  }

  async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
    self.data.write().await.insert(key.to_string(), value);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    self.data.write().await.remove(key);
    Ok(())
  }
}
