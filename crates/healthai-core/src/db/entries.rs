//! Raw cache entry operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

impl Database {
    /// Read the stored text for a fully composed key.
    pub fn get_cache_entry(&self, key: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert or overwrite an entry. Last write wins.
    pub fn put_cache_entry(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO cache_entries (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a single entry.
    pub fn delete_cache_entry(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM cache_entries WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }

    /// Delete every entry whose key starts with `prefix`.
    ///
    /// Uses an exact prefix comparison rather than LIKE, since keys contain `_`.
    pub fn delete_cache_entries_with_prefix(&self, prefix: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            "DELETE FROM cache_entries WHERE substr(key, 1, length(?1)) = ?1",
            [prefix],
        )?;
        Ok(rows_affected)
    }

    /// List keys starting with `prefix`, sorted.
    pub fn list_cache_keys(&self, prefix: &str) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT key FROM cache_entries
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            "#,
        )?;

        let rows = stmt.query_map([prefix], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let db = setup_db();

        db.put_cache_entry("health_ai_cache_pat_medications", "[]")
            .unwrap();

        let value = db.get_cache_entry("health_ai_cache_pat_medications").unwrap();
        assert_eq!(value, Some("[]".into()));
        assert_eq!(db.get_cache_entry("missing").unwrap(), None);
    }

    #[test]
    fn test_put_overwrites() {
        let db = setup_db();

        db.put_cache_entry("k", "1").unwrap();
        db.put_cache_entry("k", "2").unwrap();

        assert_eq!(db.get_cache_entry("k").unwrap(), Some("2".into()));
        assert_eq!(db.list_cache_keys("k").unwrap().len(), 1);
    }

    #[test]
    fn test_prefix_delete_is_literal() {
        let db = setup_db();

        db.put_cache_entry("health_ai_cache_a", "1").unwrap();
        db.put_cache_entry("health_ai_cache_b", "2").unwrap();
        // `_` must not act as a wildcard
        db.put_cache_entry("healthXaiXcache_c", "3").unwrap();
        db.put_cache_entry("other_app_key", "4").unwrap();

        let removed = db.delete_cache_entries_with_prefix("health_ai_cache").unwrap();
        assert_eq!(removed, 2);

        assert_eq!(db.get_cache_entry("healthXaiXcache_c").unwrap(), Some("3".into()));
        assert_eq!(db.get_cache_entry("other_app_key").unwrap(), Some("4".into()));
    }

    #[test]
    fn test_list_keys_sorted() {
        let db = setup_db();

        db.put_cache_entry("p_b", "1").unwrap();
        db.put_cache_entry("p_a", "1").unwrap();
        db.put_cache_entry("q_a", "1").unwrap();

        assert_eq!(db.list_cache_keys("p_").unwrap(), vec!["p_a", "p_b"]);
    }

    #[test]
    fn test_delete_single() {
        let db = setup_db();

        db.put_cache_entry("k", "1").unwrap();
        assert!(db.delete_cache_entry("k").unwrap());
        assert!(!db.delete_cache_entry("k").unwrap());
    }
}
