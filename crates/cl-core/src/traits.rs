//! # Core Traits (Ports)
//!
//! Any storage or identity plugin must implement these traits to be used by the binary.
//! Uniqueness constraints (submission id, (bread, user) rating pair, username, email)
//! are the store's responsibility.

use crate::models::{
    NewUser, PendingSubmission, RatingRecord, Review, Role, SubmissionStatus, Transition,
    UserProfile,
};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Persistence contract for community recipe submissions.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait SubmissionRepo: Send + Sync {
    async fn insert_submission(&self, submission: PendingSubmission) -> anyhow::Result<()>;
    async fn get_submission(&self, id: Uuid) -> anyhow::Result<Option<PendingSubmission>>;

    /// Applies `review` only if the submission is still pending. Must be atomic per id:
    /// of two racing calls exactly one observes `Transition::Applied`.
    async fn apply_review(&self, id: Uuid, review: Review) -> anyhow::Result<Transition>;

    /// All submissions, optionally restricted to one status, oldest first.
    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> anyhow::Result<Vec<PendingSubmission>>;

    /// Approved submissions targeting `bread_id`, oldest first.
    async fn list_approved_for_bread(&self, bread_id: &str)
        -> anyhow::Result<Vec<PendingSubmission>>;

    async fn list_by_submitter(&self, user_id: Uuid) -> anyhow::Result<Vec<PendingSubmission>>;
}

/// Persistence contract for per-user bread ratings.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RatingRepo: Send + Sync {
    /// Inserts or replaces the (bread, user) record as one atomic write.
    async fn upsert_rating(&self, record: RatingRecord) -> anyhow::Result<()>;
    async fn ratings_for_bread(&self, bread_id: &str) -> anyhow::Result<Vec<RatingRecord>>;
    async fn get_rating(&self, bread_id: &str, user_id: Uuid) -> anyhow::Result<Option<RatingRecord>>;
}

/// Persistence contract for accounts and their favorites.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with a wrapped `AppError::Conflict` if the username or email is taken.
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<UserProfile>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserProfile>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<UserProfile>>;
    async fn password_hash(&self, id: Uuid) -> anyhow::Result<Option<String>>;
    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<()>;

    /// Set semantics: adding twice or removing an absent id is a no-op.
    async fn add_favorite(&self, id: Uuid, bread_id: &str) -> anyhow::Result<()>;
    async fn remove_favorite(&self, id: Uuid, bread_id: &str) -> anyhow::Result<()>;
}

/// Credential contract. crumblog never stores or compares raw passwords itself.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait IdentityProvider: Send + Sync {
    /// Produces a self-describing (PHC) hash of `password`.
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies `password` against a hash produced by `hash_password`.
    fn verify_password(&self, password: &str, hash: &str) -> bool;
}
