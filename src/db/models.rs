/// Row type for the `kv_cache` table (see migrations/0001_kv_cache.sql).

#[derive(Debug, sqlx::FromRow)]
pub struct CacheRow {
    pub key: String,
    pub value: String,
    /// Epoch millis of the last write.
    pub updated_at: i64,
}
