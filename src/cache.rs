//! SQLite-backed cache for pairwise verdicts.
//!
//! Keys are content-addressed: the same two texts compared under the same
//! criterion, model and prompt template hit the same row, whatever ids the
//! players carry. Order matters; `(a, b)` and `(b, a)` are distinct rows.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictCacheKey {
    pub model: String,
    pub template_slug: String,
    pub template_hash: String,
    pub criterion_hash: String,
    pub content_a_hash: String,
    pub content_b_hash: String,
    pub key_hash: String,
}

impl VerdictCacheKey {
    pub fn new(
        model: &str,
        template_slug: &str,
        template_hash: &str,
        criterion: &str,
        content_a: &str,
        content_b: &str,
    ) -> Self {
        let criterion_hash = hash_text(criterion);
        let content_a_hash = hash_text(content_a);
        let content_b_hash = hash_text(content_b);
        let key_hash = hash_fields(&[
            model,
            template_slug,
            template_hash,
            &criterion_hash,
            &content_a_hash,
            &content_b_hash,
        ]);

        Self {
            model: model.to_string(),
            template_slug: template_slug.to_string(),
            template_hash: template_hash.to_string(),
            criterion_hash,
            content_a_hash,
            content_b_hash,
            key_hash,
        }
    }
}

/// Stored verdict: the raw winner label as the judge returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVerdict {
    pub winner: String,
    pub rationale: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache lock poisoned")]
    Poisoned,
    #[error("task join error: {0}")]
    Join(String),
}

#[async_trait]
pub trait VerdictCache: Send + Sync {
    async fn get(&self, key: &VerdictCacheKey) -> Result<Option<CachedVerdict>, CacheError>;
    async fn put(&self, key: &VerdictCacheKey, value: &CachedVerdict) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct SqliteVerdictCache {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVerdictCache {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             CREATE TABLE IF NOT EXISTS verdict_cache (\
               key_hash TEXT PRIMARY KEY,\
               model TEXT NOT NULL,\
               template_slug TEXT NOT NULL,\
               template_hash TEXT NOT NULL,\
               criterion_hash TEXT NOT NULL,\
               content_a_hash TEXT NOT NULL,\
               content_b_hash TEXT NOT NULL,\
               winner TEXT NOT NULL,\
               rationale TEXT,\
               created_at INTEGER NOT NULL,\
               updated_at INTEGER NOT NULL,\
               hit_count INTEGER NOT NULL DEFAULT 0\
             );",
        )?;

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// `CARDINAL_LEAGUE_CACHE_PATH`, else a file in the working directory.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("CARDINAL_LEAGUE_CACHE_PATH") {
            return PathBuf::from(path);
        }
        PathBuf::from(".cardinal_league_cache.sqlite")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<F, R>(&self, f: F) -> Result<R, CacheError>
    where
        F: FnOnce(&Connection) -> Result<R, CacheError>,
    {
        let guard = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        f(&guard)
    }

    async fn blocking<F, R>(&self, f: F) -> Result<R, CacheError>
    where
        F: FnOnce(&Connection) -> Result<R, CacheError> + Send + 'static,
        R: Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.with_conn(f))
            .await
            .map_err(|e| CacheError::Join(e.to_string()))?
    }

    /// Number of cached verdicts.
    pub async fn len(&self) -> Result<usize, CacheError> {
        self.blocking(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM verdict_cache", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    /// Total number of cache hits recorded across all rows.
    pub async fn total_hits(&self) -> Result<u64, CacheError> {
        self.blocking(|conn| {
            let hits: i64 = conn.query_row(
                "SELECT COALESCE(SUM(hit_count), 0) FROM verdict_cache",
                [],
                |row| row.get(0),
            )?;
            Ok(hits as u64)
        })
        .await
    }

    /// Drop rows not touched in `max_age_days`, then keep at most `max_rows`
    /// most recently used rows.
    pub async fn prune(
        &self,
        max_age_days: Option<u64>,
        max_rows: Option<usize>,
    ) -> Result<CachePruneStats, CacheError> {
        self.blocking(move |conn| {
            let mut deleted: usize = 0;
            if let Some(days) = max_age_days {
                let cutoff = now_epoch().saturating_sub((days as i64).saturating_mul(86_400));
                deleted += conn.execute(
                    "DELETE FROM verdict_cache WHERE updated_at < ?1",
                    params![cutoff],
                )?;
            }

            if let Some(max_rows) = max_rows {
                deleted += conn.execute(
                    "DELETE FROM verdict_cache WHERE key_hash NOT IN (\
                       SELECT key_hash FROM verdict_cache \
                       ORDER BY updated_at DESC, key_hash LIMIT ?1\
                     )",
                    params![max_rows as i64],
                )?;
            }

            let remaining: i64 =
                conn.query_row("SELECT COUNT(*) FROM verdict_cache", [], |row| row.get(0))?;
            Ok(CachePruneStats {
                deleted,
                remaining: remaining as usize,
            })
        })
        .await
    }
}

#[async_trait]
impl VerdictCache for SqliteVerdictCache {
    async fn get(&self, key: &VerdictCacheKey) -> Result<Option<CachedVerdict>, CacheError> {
        let key_hash = key.key_hash.clone();
        self.blocking(move |conn| {
            let mut stmt =
                conn.prepare("SELECT winner, rationale FROM verdict_cache WHERE key_hash = ?1")?;
            let mut rows = stmt.query(params![key_hash])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let entry = CachedVerdict {
                winner: row.get(0)?,
                rationale: row.get(1)?,
            };
            conn.execute(
                "UPDATE verdict_cache \
                 SET hit_count = hit_count + 1, updated_at = ?1 \
                 WHERE key_hash = ?2",
                params![now_epoch(), key_hash],
            )?;
            Ok(Some(entry))
        })
        .await
    }

    async fn put(&self, key: &VerdictCacheKey, value: &CachedVerdict) -> Result<(), CacheError> {
        let key = key.clone();
        let value = value.clone();
        self.blocking(move |conn| {
            let now = now_epoch();
            conn.execute(
                "INSERT INTO verdict_cache (\
                    key_hash, model, template_slug, template_hash, criterion_hash, \
                    content_a_hash, content_b_hash, winner, rationale, created_at, updated_at \
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
                 ON CONFLICT(key_hash) DO UPDATE SET \
                    winner = excluded.winner,\
                    rationale = excluded.rationale,\
                    updated_at = excluded.updated_at",
                params![
                    key.key_hash,
                    key.model,
                    key.template_slug,
                    key.template_hash,
                    key.criterion_hash,
                    key.content_a_hash,
                    key.content_b_hash,
                    value.winner,
                    value.rationale,
                    now,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CachePruneStats {
    pub deleted: usize,
    pub remaining: usize,
}

fn hash_text(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

fn hash_fields(fields: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update(&[0x1f]);
    }
    hasher.finalize().to_hex().to_string()
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
