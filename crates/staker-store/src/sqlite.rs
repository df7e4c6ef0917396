use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::{StateStore, StoreError};

/// SQLite-based store implementation.
///
/// Keeps every entry in a single `kv` table.
pub struct SqliteStateStore {
  pool: SqlitePool,
}

impl SqliteStateStore {
  /// Create a new SQLite store with the given connection pool.
  ///
  /// Call [`SqliteStateStore::init`] before first use.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Open (creating if missing) a database file and initialize the schema.
  pub async fn open(path: &Path) -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect_with(options)
      .await?;

    let store = Self::new(pool);
    store.init().await?;
    Ok(store)
  }

  /// Open a private in-memory database.
  ///
  /// The pool is pinned to one connection that is never recycled, since each
  /// SQLite in-memory connection is its own database.
  pub async fn in_memory() -> Result<Self, StoreError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    let pool = SqlitePoolOptions::new()
      .min_connections(1)
      .max_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_with(options)
      .await?;

    let store = Self::new(pool);
    store.init().await?;
    Ok(store)
  }

  /// Create the schema if it does not exist.
  pub async fn init(&self) -> Result<(), StoreError> {
    sqlx::query(
      r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
    )
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}

#[async_trait]
impl StateStore for SqliteStateStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let value = sqlx::query_scalar::<_, String>(
      r#"
            SELECT value
            FROM kv
            WHERE key = ?
            "#,
    )
    .bind(key)
    .fetch_optional(&self.pool)
    .await?;

    Ok(value)
  }

  async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
    sqlx::query(
      r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), StoreError> {
    sqlx::query(
      r#"
            DELETE FROM kv
            WHERE key = ?
            "#,
    )
    .bind(key)
    .execute(&self.pool)
    .await?;

    Ok(())
  }
}
