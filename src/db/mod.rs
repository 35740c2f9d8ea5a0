pub mod kv_store;
pub mod models;

pub use kv_store::{CacheStore, KvStore, MemoryKvStore, SqliteKvStore};

use sqlx::sqlite::SqlitePoolOptions;
use tracing::warn;

use crate::error::Result;

/// Open (creating if missing) the SQLite file and run migrations.
pub async fn open_pool(url: &str, max_connections: u32) -> Result<sqlx::SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// SQLite-backed cache when `url` opens, otherwise an in-memory store so the
/// service still runs. The pool is returned for shutdown.
pub async fn open_cache_store(url: &str) -> (CacheStore, Option<sqlx::SqlitePool>) {
    match open_pool(url, 4).await {
        Ok(pool) => (CacheStore::Sqlite(SqliteKvStore::new(pool.clone())), Some(pool)),
        Err(e) => {
            warn!("Database unavailable ({e}); dashboard cache falls back to memory");
            (CacheStore::Memory(MemoryKvStore::new()), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_sqlite_when_available() {
        let (store, pool) = open_cache_store("sqlite::memory:").await;
        assert_eq!(store.backend(), "sqlite");
        assert!(pool.is_some());
    }

    #[tokio::test]
    async fn unopenable_database_falls_back_to_memory() {
        let (store, pool) = open_cache_store("sqlite:/nonexistent-dir/nested/insights.db?mode=ro").await;
        assert_eq!(store.backend(), "memory");
        assert!(pool.is_none());

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
