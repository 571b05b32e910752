//! Store generation bookkeeping.
//!
//! A generation is the set of entries written under one version tag.
//! Deleting a generation removes its entries through the foreign key cascade.

use super::connection::CacheDb;
use crate::Error;
use std::collections::BTreeSet;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create generation `tag` if absent. Idempotent.
    pub async fn ensure_generation(&self, tag: &str) -> Result<(), Error> {
        let tag = tag.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (tag, created_at) VALUES (?1, ?2)",
                    params![tag, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Tags of every generation present in the store.
    pub async fn list_generations(&self) -> Result<BTreeSet<String>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<String>, Error> {
                let mut stmt = conn.prepare("SELECT tag FROM generations")?;
                let tags = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<BTreeSet<String>, _>>()?;
                Ok(tags)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete generation `tag` and all of its entries.
    ///
    /// Returns false if no such generation existed.
    pub async fn drop_generation(&self, tag: &str) -> Result<bool, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE tag = ?1", params![tag])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
