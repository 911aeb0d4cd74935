//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::{CacheRequest, CachedResponse, Generation, ResponseKind};

/// Trait for cache storage backends.
///
/// A backend holds named generations of request/response entries. Generations
/// are only ever appended to or deleted as a whole.
pub trait CacheStorage: Send + Sync {
  /// Create a generation and store all entries in one step. Either every
  /// entry lands or none does.
  fn add_all(&self, generation: &str, entries: &[(CacheRequest, CachedResponse)]) -> Result<()>;

  /// Store (or overwrite) one entry, creating the generation if absent.
  fn put(&self, generation: &str, request: &CacheRequest, response: &CachedResponse)
    -> Result<()>;

  /// Look a request up across all generations, oldest generation first.
  fn match_any(&self, request: &CacheRequest) -> Result<Option<CachedResponse>>;

  /// List all generations.
  fn generations(&self) -> Result<Vec<Generation>>;

  /// Delete a generation with all its entries. Returns false if it did not exist.
  fn delete_generation(&self, generation: &str) -> Result<bool>;

  /// Version token of the generation that currently serves requests.
  fn active_version(&self) -> Result<Option<String>>;

  fn set_active_version(&self, version: &str) -> Result<()>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Create a new SQLite storage at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Storage backed by a private in-memory database.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("stockroom").join("cache.db"))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Named cache generations, one per version token
CREATE TABLE IF NOT EXISTS cache_generations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses keyed by request identity
CREATE TABLE IF NOT EXISTS cache_entries (
    generation_id INTEGER NOT NULL,
    entry_key TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    kind TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (generation_id, entry_key),
    FOREIGN KEY (generation_id) REFERENCES cache_generations(id)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_key ON cache_entries(entry_key);

-- Single-row gateway state
CREATE TABLE IF NOT EXISTS gateway_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    active_version TEXT
);
"#;

/// Insert the generation if missing and return its id.
fn ensure_generation(conn: &Connection, name: &str) -> Result<i64> {
  conn
    .execute(
      "INSERT OR IGNORE INTO cache_generations (name) VALUES (?)",
      params![name],
    )
    .map_err(|e| eyre!("Failed to create cache generation {}: {}", name, e))?;

  conn
    .query_row(
      "SELECT id FROM cache_generations WHERE name = ?",
      params![name],
      |row| row.get(0),
    )
    .map_err(|e| eyre!("Failed to look up cache generation {}: {}", name, e))
}

fn insert_entry(
  conn: &Connection,
  generation_id: i64,
  request: &CacheRequest,
  response: &CachedResponse,
) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO cache_entries
         (generation_id, entry_key, method, url, status, kind, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        generation_id,
        request.cache_key(),
        request.method,
        request.url,
        response.status,
        response.kind.as_str(),
        headers,
        response.body,
      ],
    )
    .map_err(|e| eyre!("Failed to store cache entry for {}: {}", request.url, e))?;

  Ok(())
}

impl CacheStorage for SqliteStorage {
  fn add_all(&self, generation: &str, entries: &[(CacheRequest, CachedResponse)]) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    let generation_id = ensure_generation(&tx, generation)?;
    for (request, response) in entries {
      insert_entry(&tx, generation_id, request, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn put(
    &self,
    generation: &str,
    request: &CacheRequest,
    response: &CachedResponse,
  ) -> Result<()> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    let generation_id = ensure_generation(&tx, generation)?;
    insert_entry(&tx, generation_id, request, response)?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn match_any(&self, request: &CacheRequest) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;

    let row: Option<(u16, String, String, Vec<u8>)> = conn
      .query_row(
        "SELECT e.status, e.kind, e.headers, e.body FROM cache_entries e
         INNER JOIN cache_generations g ON g.id = e.generation_id
         WHERE e.entry_key = ?
         ORDER BY g.id
         LIMIT 1",
        params![request.cache_key()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query cache: {}", e))?;

    let Some((status, kind, headers, body)) = row else {
      return Ok(None);
    };

    let kind = ResponseKind::parse(&kind)
      .ok_or_else(|| eyre!("Unknown response kind in cache: {}", kind))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers)
      .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;

    Ok(Some(CachedResponse {
      status,
      headers,
      body,
      kind,
    }))
  }

  fn generations(&self) -> Result<Vec<Generation>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(
        "SELECT g.name, g.created_at, COUNT(e.entry_key) FROM cache_generations g
         LEFT JOIN cache_entries e ON e.generation_id = g.id
         GROUP BY g.id
         ORDER BY g.id",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows: Vec<(String, String, i64)> = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
      .map_err(|e| eyre!("Failed to list cache generations: {}", e))?
      .collect::<rusqlite::Result<_>>()
      .map_err(|e| eyre!("Failed to read cache generation: {}", e))?;

    rows
      .into_iter()
      .map(|(name, created_at, entries)| {
        Ok(Generation {
          name,
          entries: entries as usize,
          created_at: parse_datetime(&created_at)?,
        })
      })
      .collect()
  }

  fn delete_generation(&self, generation: &str) -> Result<bool> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "DELETE FROM cache_entries WHERE generation_id IN
         (SELECT id FROM cache_generations WHERE name = ?)",
      params![generation],
    )
    .map_err(|e| eyre!("Failed to delete entries of {}: {}", generation, e))?;

    let removed = tx
      .execute(
        "DELETE FROM cache_generations WHERE name = ?",
        params![generation],
      )
      .map_err(|e| eyre!("Failed to delete cache generation {}: {}", generation, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn active_version(&self) -> Result<Option<String>> {
    let conn = self.lock()?;

    let version: Option<Option<String>> = conn
      .query_row(
        "SELECT active_version FROM gateway_state WHERE id = 1",
        [],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read gateway state: {}", e))?;

    Ok(version.flatten())
  }

  fn set_active_version(&self, version: &str) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO gateway_state (id, active_version) VALUES (1, ?)",
        params![version],
      )
      .map_err(|e| eyre!("Failed to record active version: {}", e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
