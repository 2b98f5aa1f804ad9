//! SQLite-backed progress store implementation.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::ProgressRecord;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the checkpoint database.
///
/// The database file lives under the XDG state directory:
/// `~/.local/state/imgbatch/progress.db` on Debian.
#[derive(Clone)]
pub struct ProgressDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl ProgressDb {
    /// Open (or create) the default progress database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("imgbatch")?;
        let db_path = xdg_dirs.get_state_home().join("imgbatch").join("progress.db");
        Self::open_at(&db_path).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await?;
        let db = ProgressDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // Key-value layout: the record is kept as JSON text in its external shape.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS progress (
                key TEXT PRIMARY KEY NOT NULL,
                record TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load the checkpoint stored under `key`.
    ///
    /// Missing, unparseable, or inconsistent records all come back as `None`;
    /// a damaged checkpoint must never stop a run. Only database I/O errors are returned.
    pub async fn load(&self, key: &str) -> Result<Option<ProgressRecord>> {
        let row = sqlx::query("SELECT record FROM progress WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = match row.try_get("record") {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "unreadable progress record, ignoring: {}", e);
                return Ok(None);
            }
        };
        Ok(parse_record(key, &raw))
    }

    /// Overwrite the checkpoint under `key`. A single upsert, so readers see
    /// either the previous record or the new one.
    pub async fn save(&self, key: &str, record: &ProgressRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO progress (key, record, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove the checkpoint under `key`. Returns true if one existed.
    pub async fn clear(&self, key: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM progress WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Store raw text under `key` without validation.
    #[cfg(test)]
    pub(crate) async fn save_raw(&self, key: &str, raw: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO progress (key, record, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_record(key: &str, raw: &str) -> Option<ProgressRecord> {
    match serde_json::from_str::<ProgressRecord>(raw) {
        Ok(record) if record.is_consistent() => Some(record),
        Ok(record) => {
            tracing::warn!(
                key,
                last_completed_index = record.last_completed_index,
                total = record.total,
                "inconsistent progress record, ignoring"
            );
            None
        }
        Err(e) => {
            tracing::warn!(key, "corrupt progress record, ignoring: {}", e);
            None
        }
    }
}

/// Current time as Unix seconds (for row timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Current time as Unix milliseconds (for record timestamps).
pub(crate) fn unix_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<ProgressDb> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = ProgressDb { pool };
    db.migrate().await?;
    Ok(db)
}
