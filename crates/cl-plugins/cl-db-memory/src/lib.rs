//! # cl-db-memory
//!
//! In-process implementation of every repository port, for development and tests.
//! Entries live in `DashMap` shards; the moderation compare-and-swap runs under the
//! shard write lock of the submission it touches, so it is atomic per id.

use async_trait::async_trait;
use cl_core::models::{
    NewUser, PendingSubmission, RatingRecord, Review, Role, SubmissionStatus, Transition,
    UserProfile,
};
use cl_core::traits::{RatingRepo, SubmissionRepo, UserRepo};
use cl_core::AppError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

struct UserRow {
    user: NewUser,
    favorites: BTreeSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    submissions: DashMap<Uuid, PendingSubmission>,
    ratings: DashMap<(String, Uuid), RatingRecord>,
    users: DashMap<Uuid, UserRow>,
    /// Unique indexes: lower-cased email / username -> user id.
    emails: DashMap<String, Uuid>,
    usernames: DashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut items: Vec<PendingSubmission>) -> Vec<PendingSubmission> {
        items.sort_by_key(|s| (s.submitted_at, s.id));
        items
    }

    fn collect_submissions(&self, keep: impl Fn(&PendingSubmission) -> bool) -> Vec<PendingSubmission> {
        Self::sorted(
            self.submissions
                .iter()
                .filter(|e| keep(e.value()))
                .map(|e| e.value().clone())
                .collect(),
        )
    }

    fn profile(&self, id: Uuid) -> Option<UserProfile> {
        let (user, favorites) = {
            let row = self.users.get(&id)?;
            (row.user.clone(), row.favorites.clone())
        };
        let submitted_recipes = self
            .collect_submissions(|s| s.submitted_by == id)
            .into_iter()
            .map(|s| s.id)
            .collect();
        let ratings: BTreeMap<String, u8> = self
            .ratings
            .iter()
            .filter(|e| e.value().user_id == id)
            .map(|e| (e.value().bread_id.clone(), e.value().value))
            .collect();

        Some(UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            joined_at: user.joined_at,
            favorites,
            submitted_recipes,
            ratings,
        })
    }

    fn missing_user(id: Uuid) -> anyhow::Error {
        AppError::not_found("User", id).into()
    }
}

#[async_trait]
impl SubmissionRepo for MemoryStore {
    async fn insert_submission(&self, submission: PendingSubmission) -> anyhow::Result<()> {
        match self.submissions.entry(submission.id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "submission {} already exists",
                submission.id
            ))
            .into()),
            Entry::Vacant(slot) => {
                slot.insert(submission);
                Ok(())
            }
        }
    }

    async fn get_submission(&self, id: Uuid) -> anyhow::Result<Option<PendingSubmission>> {
        Ok(self.submissions.get(&id).map(|e| e.value().clone()))
    }

    async fn apply_review(&self, id: Uuid, review: Review) -> anyhow::Result<Transition> {
        let Some(mut entry) = self.submissions.get_mut(&id) else {
            return Ok(Transition::NotFound);
        };
        Ok(match entry.value_mut().apply_review(&review) {
            Ok(()) => Transition::Applied(entry.value().clone()),
            Err(current) => Transition::AlreadyDecided(current),
        })
    }

    async fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> anyhow::Result<Vec<PendingSubmission>> {
        Ok(self.collect_submissions(|s| status.map_or(true, |st| s.status == st)))
    }

    async fn list_approved_for_bread(
        &self,
        bread_id: &str,
    ) -> anyhow::Result<Vec<PendingSubmission>> {
        Ok(self.collect_submissions(|s| {
            s.bread_id == bread_id && s.status == SubmissionStatus::Approved
        }))
    }

    async fn list_by_submitter(&self, user_id: Uuid) -> anyhow::Result<Vec<PendingSubmission>> {
        Ok(self.collect_submissions(|s| s.submitted_by == user_id))
    }
}

#[async_trait]
impl RatingRepo for MemoryStore {
    async fn upsert_rating(&self, record: RatingRecord) -> anyhow::Result<()> {
        let key = (record.bread_id.clone(), record.user_id);
        self.ratings.insert(key, record);
        Ok(())
    }

    async fn ratings_for_bread(&self, bread_id: &str) -> anyhow::Result<Vec<RatingRecord>> {
        Ok(self
            .ratings
            .iter()
            .filter(|e| e.key().0 == bread_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn get_rating(
        &self,
        bread_id: &str,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RatingRecord>> {
        Ok(self
            .ratings
            .get(&(bread_id.to_string(), user_id))
            .map(|e| e.value().clone()))
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<()> {
        let email_key = user.email.to_lowercase();
        let username_key = user.username.to_lowercase();

        match self.emails.entry(email_key.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict(format!("email '{}' is already registered", user.email)).into())
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        match self.usernames.entry(username_key) {
            Entry::Occupied(_) => {
                self.emails.remove(&email_key);
                return Err(AppError::Conflict(format!("username '{}' is taken", user.username)).into());
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        self.users.insert(user.id, UserRow { user, favorites: BTreeSet::new() });
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.profile(id))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserProfile>> {
        let id = self.emails.get(&email.to_lowercase()).map(|e| *e.value());
        Ok(id.and_then(|id| self.profile(id)))
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<UserProfile>> {
        let id = self.usernames.get(&username.to_lowercase()).map(|e| *e.value());
        Ok(id.and_then(|id| self.profile(id)))
    }

    async fn password_hash(&self, id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(self.users.get(&id).map(|row| row.user.password_hash.clone()))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> anyhow::Result<()> {
        let mut row = self.users.get_mut(&id).ok_or_else(|| Self::missing_user(id))?;
        row.user.role = role;
        Ok(())
    }

    async fn add_favorite(&self, id: Uuid, bread_id: &str) -> anyhow::Result<()> {
        let mut row = self.users.get_mut(&id).ok_or_else(|| Self::missing_user(id))?;
        row.favorites.insert(bread_id.to_string());
        Ok(())
    }

    async fn remove_favorite(&self, id: Uuid, bread_id: &str) -> anyhow::Result<()> {
        let mut row = self.users.get_mut(&id).ok_or_else(|| Self::missing_user(id))?;
        row.favorites.remove(bread_id);
        Ok(())
    }
}
