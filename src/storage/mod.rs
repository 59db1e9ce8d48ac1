use chrono::{NaiveDateTime, Utc};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS page_cache (
    key         VARCHAR PRIMARY KEY,
    body        VARCHAR NOT NULL,
    fetched_at  TIMESTAMP NOT NULL
);
"#;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache database: {0}")]
    Db(#[from] duckdb::Error),
    #[error("cache directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache connection lock poisoned")]
    Poisoned,
}

/// Fetched documents kept between runs, so slow static pages are not
/// downloaded for every query. Entries older than `max_age` are misses.
pub trait TableCache: Send + Sync {
    fn get(&self, key: &str, max_age: Duration) -> Result<Option<String>, CacheError>;
    fn put(&self, key: &str, body: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub entries: i64,
    pub oldest: Option<NaiveDateTime>,
    pub newest: Option<NaiveDateTime>,
}

// ── DuckDB-backed cache ───────────────────────────────────────────────────────

pub struct DuckDbCache {
    conn: Mutex<Connection>,
}

impl DuckDbCache {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.execute_batch(DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    fn put_at(&self, key: &str, body: &str, fetched_at: NaiveDateTime) -> Result<(), CacheError> {
        self.conn()?.execute(
            r#"INSERT INTO page_cache (key, body, fetched_at) VALUES (?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET
                   body = excluded.body,
                   fetched_at = excluded.fetched_at"#,
            params![key, body, fetched_at],
        )?;
        Ok(())
    }

    fn get_at(
        &self,
        key: &str,
        max_age: Duration,
        now: NaiveDateTime,
    ) -> Result<Option<String>, CacheError> {
        let conn = self.conn()?;
        let row = conn.query_row(
            "SELECT body, fetched_at FROM page_cache WHERE key = ?",
            params![key],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, NaiveDateTime>(1)?)),
        );
        let (body, fetched_at) = match row {
            Ok(found) => found,
            Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let age = (now - fetched_at).to_std().unwrap_or(Duration::ZERO);
        if age > max_age {
            debug!("cache entry {} is stale ({:?} old)", key, age);
            return Ok(None);
        }
        Ok(Some(body))
    }

    /// Drop every entry older than `max_age`. Returns how many went.
    pub fn purge_older_than(&self, max_age: Duration) -> Result<usize, CacheError> {
        let age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .naive_utc()
            .checked_sub_signed(age)
            .unwrap_or(NaiveDateTime::MIN);
        let n = self
            .conn()?
            .execute("DELETE FROM page_cache WHERE fetched_at < ?", params![cutoff])?;
        info!("Purged {} cache entries", n);
        Ok(n)
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            "SELECT COUNT(*), MIN(fetched_at), MAX(fetched_at) FROM page_cache",
            [],
            |r| {
                Ok(CacheStats {
                    entries: r.get(0)?,
                    oldest: r.get(1)?,
                    newest: r.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }
}

impl TableCache for DuckDbCache {
    fn get(&self, key: &str, max_age: Duration) -> Result<Option<String>, CacheError> {
        self.get_at(key, max_age, Utc::now().naive_utc())
    }

    fn put(&self, key: &str, body: &str) -> Result<(), CacheError> {
        self.put_at(key, body, Utc::now().naive_utc())
    }
}
