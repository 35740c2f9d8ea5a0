use std::future::Future;

use chrono::Utc;
use dashmap::DashMap;
use tracing::trace;

use crate::db::models::CacheRow;
use crate::error::Result;

/// String key → string value store backing the dashboard metrics cache.
/// Every access may fail; callers decide whether a failure matters.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SqliteKvStore {
    pool: sqlx::SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, CacheRow>(
            "SELECT key, value, updated_at FROM kv_cache WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            trace!(key = %r.key, updated_at = r.updated_at, "kv cache read");
            r.value
        }))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_cache (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Selected at startup
// ---------------------------------------------------------------------------

/// The store the service actually runs on: SQLite when the database opens,
/// process memory otherwise.
pub enum CacheStore {
    Sqlite(SqliteKvStore),
    Memory(MemoryKvStore),
}

impl CacheStore {
    pub fn backend(&self) -> &'static str {
        match self {
            CacheStore::Sqlite(_) => "sqlite",
            CacheStore::Memory(_) => "memory",
        }
    }
}

impl KvStore for CacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            CacheStore::Sqlite(s) => s.get(key).await,
            CacheStore::Memory(m) => m.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self {
            CacheStore::Sqlite(s) => s.set(key, value).await,
            CacheStore::Memory(m) => m.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match self {
            CacheStore::Sqlite(s) => s.remove(key).await,
            CacheStore::Memory(m) => m.remove(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_pool;

    async fn sqlite_store() -> SqliteKvStore {
        // One connection: every `sqlite::memory:` connection is its own database.
        let pool = open_pool("sqlite::memory:", 1).await.expect("in-memory pool");
        SqliteKvStore::new(pool)
    }

    #[tokio::test]
    async fn sqlite_set_get_overwrite_remove() {
        let store = sqlite_store().await;
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "one").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("one"));

        store.set("k", "two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryKvStore::new();
        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        store.remove("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }
}
