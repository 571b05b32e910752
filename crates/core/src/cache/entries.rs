//! Stored response CRUD within a generation.

use super::connection::CacheDb;
use super::key::RequestKey;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response captured for later replay.
///
/// Immutable once written; a later write for the same key replaces it whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Value of the first header matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl CacheDb {
    /// Insert or replace the entry for `key` in generation `tag`.
    ///
    /// The generation row is created on demand. When a quota is configured
    /// the write is rejected if the generation's total body size, excluding
    /// any entry being replaced, would exceed it.
    pub async fn put_entry(&self, tag: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        let tag = tag.to_string();
        let key_hash = key.hash();
        let method = key.method();
        let url = key.url().to_string();
        let response = response.clone();
        let quota = self.quota_bytes;
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (tag, created_at) VALUES (?1, ?2)",
                    params![tag, chrono::Utc::now().to_rfc3339()],
                )?;

                let size = response.body.len() as u64;
                if let Some(quota) = quota {
                    let used: i64 = tx.query_row(
                        "SELECT COALESCE(SUM(size), 0) FROM entries WHERE generation = ?1 AND key_hash != ?2",
                        params![tag, key_hash],
                        |row| row.get(0),
                    )?;
                    let used = used as u64;
                    if used + size > quota {
                        return Err(Error::QuotaExceeded { used, requested: size, quota });
                    }
                }

                tx.execute(
                    "INSERT INTO entries (
                        generation, key_hash, method, url, status, status_text,
                        headers_json, body, size, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        size = excluded.size,
                        stored_at = excluded.stored_at",
                    params![
                        tag,
                        key_hash,
                        method,
                        url,
                        response.status,
                        response.status_text,
                        headers_json,
                        response.body,
                        size as i64,
                        response.stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry for `key` in generation `tag`.
    ///
    /// Returns None if the generation or the entry doesn't exist.
    pub async fn get_entry(&self, tag: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let tag = tag.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, status_text, headers_json, body, stored_at
                    FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![tag, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                });

                match result {
                    Ok((url, status, status_text, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::InvalidInput(format!("stored headers for {url}: {e}")))?;
                        Ok(Some(StoredResponse { url, status, status_text, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in generation `tag`, oldest first.
    pub async fn list_entry_urls(&self, tag: &str) -> Result<Vec<String>, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY stored_at ASC")?;
                let urls = stmt
                    .query_map(params![tag], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries and total body bytes in generation `tag`.
    pub async fn generation_usage(&self, tag: &str) -> Result<(u64, u64), Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<(u64, u64), Error> {
                let (count, bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM entries WHERE generation = ?1",
                    params![tag],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok((count as u64, bytes as u64))
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the oldest entries of generation `tag` until at most
    /// `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_oldest_entries(&self, tag: &str, max_entries: usize) -> Result<u64, Error> {
        let tag = tag.to_string();
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![tag], |row| {
                        row.get(0)
                    })?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash IN (
                        SELECT key_hash FROM entries WHERE generation = ?1
                        ORDER BY stored_at ASC LIMIT ?2
                    )",
                    params![tag, count.saturating_sub(max)],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
