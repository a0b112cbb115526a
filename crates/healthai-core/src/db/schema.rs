//! SQLite schema definition.

/// Complete database schema for the local cache.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Cache Entries (key/value, JSON payloads)
-- ============================================================================

-- Keys are fully composed by the cache store: {prefix}_{identity}_{logical_key}
-- for per-user data, {prefix}_{logical_key} for the global partition.
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_updated ON cache_entries(updated_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO cache_entries (key, value) VALUES ('a', '1')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO cache_entries (key, value) VALUES ('a', '2')",
            [],
        );
        assert!(result.is_err());
    }
}
