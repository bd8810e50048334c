//! # cl-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `cl-core` domain models. Uniqueness lives in the schema: primary keys on
//! submission id and (bread_id, user_id), unique username/email.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cl_core::models::{
    Decision, NewUser, PendingSubmission, RatingRecord, Review, Role, SubmissionStatus,
    Transition, UserProfile,
};
use cl_core::traits::{RatingRepo, SubmissionRepo, UserRepo};
use cl_core::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            BLOB PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    display_name  TEXT,
    role          TEXT NOT NULL CHECK (role IN ('user', 'admin')),
    joined_at     INTEGER NOT NULL,
    password_hash TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS favorites (
    user_id  BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    bread_id TEXT NOT NULL,
    PRIMARY KEY (user_id, bread_id)
);

CREATE TABLE IF NOT EXISTS submissions (
    id               BLOB PRIMARY KEY,
    bread_id         TEXT NOT NULL,
    submitted_by     BLOB NOT NULL,
    submitted_at     INTEGER NOT NULL,
    status           TEXT NOT NULL CHECK (status IN ('pending', 'approved', 'rejected')),
    reviewed_by      BLOB,
    reviewed_at      INTEGER,
    rejection_reason TEXT,
    recipe           TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS submissions_by_status ON submissions (status, submitted_at);
CREATE INDEX IF NOT EXISTS submissions_by_bread ON submissions (bread_id, status, submitted_at);
CREATE INDEX IF NOT EXISTS submissions_by_submitter ON submissions (submitted_by, submitted_at);

CREATE TABLE IF NOT EXISTS ratings (
    bread_id TEXT NOT NULL,
    user_id  BLOB NOT NULL,
    value    INTEGER NOT NULL CHECK (value BETWEEN 1 AND 5),
    rated_at INTEGER NOT NULL,
    PRIMARY KEY (bread_id, user_id)
);
"#;

const SUBMISSION_COLUMNS: &str = "id, bread_id, submitted_by, submitted_at, status, \
     reviewed_by, reviewed_at, rejection_reason, recipe";

pub struct SqliteStore {
    pool: SqlitePool,
}

/// Lookup key bound into a `WHERE column = ?` clause.
enum Key<'a> {
    Text(&'a str),
    Blob(Vec<u8>),
}

// Helpers for UUID and timestamp conversion.
// Timestamps are stored as microseconds so that ORDER BY is chronological.
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Ok(Uuid::from_slice(blob)?)
}

fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(micros: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| anyhow::anyhow!("timestamp {micros} out of range"))
}

/// Unique-constraint violations become `AppError::Conflict`; anything else passes through.
fn conflict_or(err: sqlx::Error, what: &str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("{what} already exists")).into()
        }
        _ => err.into(),
    }
}

fn submission_from_row(row: &SqliteRow) -> anyhow::Result<PendingSubmission> {
    Ok(PendingSubmission {
        id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?,
        bread_id: row.try_get("bread_id")?,
        submitted_by: blob_to_uuid(&row.try_get::<Vec<u8>, _>("submitted_by")?)?,
        submitted_at: from_micros(row.try_get("submitted_at")?)?,
        status: SubmissionStatus::from_str(&row.try_get::<String, _>("status")?)
            .map_err(anyhow::Error::msg)?,
        reviewed_by: row
            .try_get::<Option<Vec<u8>>, _>("reviewed_by")?
            .map(|b| blob_to_uuid(&b))
            .transpose()?,
        reviewed_at: row
            .try_get::<Option<i64>, _>("reviewed_at")?
            .map(from_micros)
            .transpose()?,
        rejection_reason: row.try_get("rejection_reason")?,
        recipe: serde_json::from_str(&row.try_get::<String, _>("recipe")?)?,
    })
}

fn rating_from_row(row: &SqliteRow) -> anyhow::Result<RatingRecord> {
    Ok(RatingRecord {
        bread_id: row.try_get("bread_id")?,
        user_id: blob_to_uuid(&row.try_get::<Vec<u8>, _>("user_id")?)?,
        value: u8::try_from(row.try_get::<i64, _>("value")?)?,
        rated_at: from_micros(row.try_get("rated_at")?)?,
    })
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    ///
    /// # Developer Note
    /// Every connection to `sqlite::memory:` is its own database, so in-memory
    /// URLs get a single connection that is never recycled.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let mut pool = SqlitePoolOptions::new();
        if url.contains(":memory:") {
            pool = pool
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }
        let store = Self { pool: pool.connect_with(options).await? };
        store.migrate().await?;
        info!(url, "sqlite store ready");
        Ok(store)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_submissions(
        &self,
        filter: &str,
        key: Option<Key<'_>>,
    ) -> anyhow::Result<Vec<PendingSubmission>> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions {filter} ORDER BY submitted_at ASC, id ASC"
        );
        let query = sqlx::query(&sql);
        let query = match key {
            Some(Key::Text(text)) => query.bind(text.to_string()),
            Some(Key::Blob(blob)) => query.bind(blob),
            None => query,
        };
        query
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(submission_from_row)
            .collect()
    }

    async fn profile_where(&self, column: &str, key: Key<'_>) -> anyhow::Result<Option<UserProfile>> {
        let sql = format!(
            "SELECT id, username, email, display_name, role, joined_at FROM users WHERE {column} = ?"
        );
        let query = sqlx::query(&sql);
        let query = match key {
            Key::Text(text) => query.bind(text.to_string()),
            Key::Blob(blob) => query.bind(blob),
        };
        let Some(row) = query.fetch_optional(&self.pool).await? else {
            return Ok(None);
        };

        let id = blob_to_uuid(&row.try_get::<Vec<u8>, _>("id")?)?;
        let favorites: BTreeSet<String> =
            sqlx::query_scalar::<_, String>("SELECT bread_id FROM favorites WHERE user_id = ?")
                .bind(uuid_to_blob(id))
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();
        let submitted_recipes = sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT id FROM submissions WHERE submitted_by = ? ORDER BY submitted_at ASC, id ASC",
        )
        .bind(uuid_to_blob(id))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|b| blob_to_uuid(b))
        .collect::<anyhow::Result<Vec<_>>>()?;
        let ratings = sqlx::query("SELECT bread_id, value FROM ratings WHERE user_id = ?")
            .bind(uuid_to_blob(id))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|r| Ok((r.try_get::<String, _>("bread_id")?, u8::try_from(r.try_get::<i64, _>("value")?)?)))
            .collect::<anyhow::Result<BTreeMap<_, _>>>()?;

        Ok(Some(UserProfile {
            id,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            role: Role::from_str(&row.try_get::<String, _>("role")?).map_err(anyhow::Error::msg)?,
            joined_at: from_micros(row.try_get("joined_at")?)?,
            favorites,
            submitted_recipes,
            ratings,
        }))
    }

    async fn ensure_user(&self, id: Uuid) -> anyhow::Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("User", id).into()),
        }
    }
}

#[async_trait]
impl SubmissionRepo for SqliteStore {
    async fn insert_submission(&self, submission: PendingSubmission) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO submissions (id, bread_id, submitted_by, submitted_at, status, reviewed_by, reviewed_at, rejection_reason, recipe) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(submission.id))
            .bind(&submission.bread_id)
            .bind(uuid_to_blob(submission.submitted_by))
            .bind(to_micros(submission.submitted_at))
            .bind(submission.status.as_str())
            .bind(submission.reviewed_by.map(uuid_to_blob))
            .bind(submission.reviewed_at.map(to_micros))
            .bind(&submission.rejection_reason)
            .bind(serde_json::to_string(&submission.recipe)?)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "submission"))?;
        Ok(())
    }

    async fn get_submission(&self, id: Uuid) -> anyhow::Result<Option<PendingSubmission>> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?");
        sqlx::query(&sql)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(submission_from_row)
            .transpose()
    }

    /// Single-statement compare-and-swap: the `status = 'pending'` guard makes
    /// the losing writer match zero rows.
    async fn apply_review(&self, id: Uuid, review: Review) -> anyhow::Result<Transition> {
        let status = review.decision.target_status();
        let reason = match &review.decision {
            Decision::Reject { reason } => reason.clone(),
            Decision::Approve => None,
        };

        let updated = sqlx::query("UPDATE submissions SET status = ?, reviewed_by = ?, reviewed_at = ?, rejection_reason = ? WHERE id = ? AND status = 'pending'")
            .bind(status.as_str())
            .bind(uuid_to_blob(review.reviewer))
            .bind(to_micros(review.reviewed_at))
            .bind(reason)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?
            .rows_affected();

        let current = self.get_submission(id).await?;
        Ok(match (updated, current) {
            (_, None) => Transition::NotFound,
            (1, Some(s)) => Transition::Applied(s),
            (_, Some(s)) => Transition::AlreadyDecided(s.status),
        })
    }

    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> anyhow::Result<Vec<PendingSubmission>> {
        match status {
            Some(status) => self.fetch_submissions("WHERE status = ?", Some(Key::Text(status.as_str()))).await,
            None => self.fetch_submissions("", None).await,
        }
    }

    async fn list_approved_for_bread(
        &self,
        bread_id: &str,
    ) -> anyhow::Result<Vec<PendingSubmission>> {
        self.fetch_submissions("WHERE bread_id = ? AND status = 'approved'", Some(Key::Text(bread_id)))
            .await
    }

    async fn list_by_submitter(&self, user_id: Uuid) -> anyhow::Result<Vec<PendingSubmission>> {
        self.fetch_submissions("WHERE submitted_by = ?", Some(Key::Blob(uuid_to_blob(user_id))))
            .await
    }
}

#[async_trait]
impl RatingRepo for SqliteStore {
    /// One statement, so concurrent raters never upgrade a read lock to a write lock.
    async fn upsert_rating(&self, record: RatingRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO ratings (bread_id, user_id, value, rated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT (bread_id, user_id) DO UPDATE SET value = excluded.value, rated_at = excluded.rated_at",
        )
        .bind(&record.bread_id)
        .bind(uuid_to_blob(record.user_id))
        .bind(i64::from(record.value))
        .bind(to_micros(record.rated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ratings_for_bread(&self, bread_id: &str) -> anyhow::Result<Vec<RatingRecord>> {
        sqlx::query("SELECT bread_id, user_id, value, rated_at FROM ratings WHERE bread_id = ?")
            .bind(bread_id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(rating_from_row)
            .collect()
    }

    async fn get_rating(
        &self,
        bread_id: &str,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RatingRecord>> {
        sqlx::query("SELECT bread_id, user_id, value, rated_at FROM ratings WHERE bread_id = ? AND user_id = ?")
            .bind(bread_id)
            .bind(uuid_to_blob(user_id))
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(rating_from_row)
            .transpose()
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO users (id, username, email, display_name, role, joined_at, password_hash) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(user.id))
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.role.as_str())
            .bind(to_micros(user.joined_at))
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "username or email"))?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        self.profile_where("id", Key::Blob(uuid_to_blob(id))).await
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserProfile>> {
        self.profile_where("email", Key::Text(email)).await
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<UserProfile>> {
        self.profile_where("username", Key::Text(username)).await
    }

    async fn password_hash(&self, id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<()> {
        let updated = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(AppError::not_found("User", id).into());
        }
        Ok(())
    }

    async fn add_favorite(&self, id: Uuid, bread_id: &str) -> anyhow::Result<()> {
        self.ensure_user(id).await?;
        sqlx::query("INSERT OR IGNORE INTO favorites (user_id, bread_id) VALUES (?, ?)")
            .bind(uuid_to_blob(id))
            .bind(bread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_favorite(&self, id: Uuid, bread_id: &str) -> anyhow::Result<()> {
        self.ensure_user(id).await?;
        sqlx::query("DELETE FROM favorites WHERE user_id = ? AND bread_id = ?")
            .bind(uuid_to_blob(id))
            .bind(bread_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
