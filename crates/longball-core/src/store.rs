// SQLite persistence for saved weight profiles.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::info;

use crate::weights::{WeightError, WeightProfile, Weights};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to (de)serialize weights: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid timestamp `{value}` on profile {id}")]
    Timestamp { id: String, value: String },

    #[error("{field} must not be blank")]
    Blank { field: &'static str },

    #[error(transparent)]
    Weights(#[from] WeightError),
}

/// Saved weight profiles, keyed by owning user. Profiles are insert-only.
pub struct WeightStore {
    conn: Mutex<Connection>,
}

impl WeightStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral store (useful for tests).
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS weight_profiles (
                id         TEXT PRIMARY KEY,
                user_id    TEXT NOT NULL,
                name       TEXT NOT NULL,
                weights    TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weight_profiles_user ON weight_profiles(user_id);
            ",
        )?;
        info!("Weight store opened at {path}");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection. Panics only if another thread panicked while
    /// holding the lock.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("weight store mutex poisoned")
    }

    /// All profiles saved by `user_id`, oldest first.
    pub fn get_weights(&self, user_id: &str) -> Result<Vec<WeightProfile>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, weights, created_at
             FROM weight_profiles WHERE user_id = ?1
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![user_id], raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawProfile::into_profile).collect()
    }

    /// Look up a single profile by ID.
    pub fn get_profile(&self, id: &str) -> Result<Option<WeightProfile>, StoreError> {
        let conn = self.conn();
        let raw = conn
            .query_row(
                "SELECT id, user_id, name, weights, created_at
                 FROM weight_profiles WHERE id = ?1",
                params![id],
                raw_row,
            )
            .optional()?;
        raw.map(RawProfile::into_profile).transpose()
    }

    /// Save a new named profile for `user_id` and return it.
    pub fn save_weights(
        &self,
        user_id: &str,
        name: &str,
        weights: &Weights,
    ) -> Result<WeightProfile, StoreError> {
        let user_id = user_id.trim();
        let name = name.trim();
        if user_id.is_empty() {
            return Err(StoreError::Blank { field: "user_id" });
        }
        if name.is_empty() {
            return Err(StoreError::Blank { field: "name" });
        }
        weights.validate()?;

        let weights_json = serde_json::to_string(weights)?;

        // The write lock is taken up front so the row number read below is
        // still the next one when the insert lands, even with other handles
        // or processes on the same file.
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let next_row: i64 = tx.query_row(
            "SELECT COALESCE(MAX(rowid), 0) + 1 FROM weight_profiles",
            [],
            |row| row.get(0),
        )?;
        let now = Utc::now();
        let profile = WeightProfile {
            id: generate_id(now, next_row),
            user_id: user_id.to_string(),
            name: name.to_string(),
            weights: *weights,
            created_at: now,
        };
        tx.execute(
            "INSERT INTO weight_profiles (rowid, id, user_id, name, weights, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                next_row,
                profile.id,
                profile.user_id,
                profile.name,
                weights_json,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;
        info!("Saved weight profile '{}' ({}) for user {}", profile.name, profile.id, profile.user_id);
        Ok(profile)
    }
}

/// Build a profile ID from the save timestamp and the row it will occupy.
///
/// Format: `wp_YYYYMMDD_HHMMSS_SSS_N` (e.g. `wp_20260419_183022_123_7`).
fn generate_id(now: DateTime<Utc>, row: i64) -> String {
    format!("{}_{row}", now.format("wp_%Y%m%d_%H%M%S_%3f"))
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct RawProfile {
    id: String,
    user_id: String,
    name: String,
    weights: String,
    created_at: String,
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawProfile> {
    Ok(RawProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        weights: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl RawProfile {
    fn into_profile(self) -> Result<WeightProfile, StoreError> {
        let weights: Weights = serde_json::from_str(&self.weights)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| StoreError::Timestamp {
                id: self.id.clone(),
                value: self.created_at.clone(),
            })?
            .with_timezone(&Utc);
        Ok(WeightProfile {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            weights,
            created_at,
        })
    }
}
