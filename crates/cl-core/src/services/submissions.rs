//! # Submission Queue
//!
//! Community recipes enter as `Pending` and are moved exactly once to `Approved`
//! or `Rejected` by an admin. The transition itself is a compare-and-swap in the
//! store, so two racing moderators cannot both win.

use crate::catalog::Catalog;
use crate::error::{AppError, Result};
use crate::models::{
    Decision, PendingSubmission, Recipe, RecipeDraft, Review, SubmissionStatus, Transition,
};
use crate::services::identity::IdentityStore;
use crate::traits::SubmissionRepo;
use crate::validation::normalize_recipe;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct SubmissionQueue {
    catalog: Arc<Catalog>,
    repo: Arc<dyn SubmissionRepo>,
    identity: Arc<IdentityStore>,
}

impl SubmissionQueue {
    pub fn new(
        catalog: Arc<Catalog>,
        repo: Arc<dyn SubmissionRepo>,
        identity: Arc<IdentityStore>,
    ) -> Self {
        Self { catalog, repo, identity }
    }

    pub async fn submit(
        &self,
        bread_id: &str,
        draft: RecipeDraft,
        submitter: Uuid,
    ) -> Result<PendingSubmission> {
        self.identity.require_member(submitter).await?;
        if !self.catalog.contains(bread_id) {
            return Err(AppError::validation(format!("unknown bread '{bread_id}'")));
        }

        let id = Uuid::now_v7();
        let recipe = normalize_recipe(&draft, id.to_string())?;
        let submission = PendingSubmission {
            id,
            bread_id: bread_id.to_string(),
            submitted_by: submitter,
            submitted_at: Utc::now(),
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            recipe,
        };
        self.repo.insert_submission(submission.clone()).await?;
        debug!(submission_id = %id, bread_id, submitter = %submitter, "recipe submitted");
        Ok(submission)
    }

    pub async fn approve(&self, id: Uuid, reviewer: Uuid) -> Result<PendingSubmission> {
        self.moderate(id, reviewer, Decision::Approve).await
    }

    pub async fn reject(
        &self,
        id: Uuid,
        reviewer: Uuid,
        reason: Option<String>,
    ) -> Result<PendingSubmission> {
        self.moderate(id, reviewer, Decision::Reject { reason }).await
    }

    async fn moderate(
        &self,
        id: Uuid,
        reviewer: Uuid,
        decision: Decision,
    ) -> Result<PendingSubmission> {
        self.identity.require_admin(reviewer).await?;

        let review = Review { decision, reviewer, reviewed_at: Utc::now() };
        match self.repo.apply_review(id, review).await? {
            Transition::Applied(submission) => {
                info!(
                    submission_id = %id,
                    reviewer = %reviewer,
                    status = submission.status.as_str(),
                    "submission moderated"
                );
                Ok(submission)
            }
            Transition::NotFound => Err(AppError::not_found("Submission", id)),
            Transition::AlreadyDecided(status) => Err(AppError::InvalidState(format!(
                "submission {id} is already {status}"
            ))),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<PendingSubmission> {
        self.repo
            .get_submission(id)
            .await?
            .ok_or_else(|| AppError::not_found("Submission", id))
    }

    /// The moderation queue, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        self.list(Some(SubmissionStatus::Pending)).await
    }

    pub async fn list(&self, status: Option<SubmissionStatus>) -> Result<Vec<PendingSubmission>> {
        Ok(self.repo.list_submissions(status).await?)
    }

    pub async fn list_for_submitter(&self, user: Uuid) -> Result<Vec<PendingSubmission>> {
        Ok(self.repo.list_by_submitter(user).await?)
    }

    /// Approved community recipes for a bread, in submission order,
    /// without moderation metadata.
    pub async fn list_approved_for_bread(&self, bread_id: &str) -> Result<Vec<Recipe>> {
        Ok(self
            .repo
            .list_approved_for_bread(bread_id)
            .await?
            .into_iter()
            .map(|s| s.recipe)
            .collect())
    }
}
