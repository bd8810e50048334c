//! # Rating Aggregator
//!
//! One rating per (bread, user); re-rating replaces the old value. Summaries are
//! recomputed from the full set on every read.

use crate::catalog::Catalog;
use crate::error::{AppError, Result};
use crate::models::{RatingRecord, RatingSummary};
use crate::services::identity::IdentityStore;
use crate::traits::RatingRepo;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Mean rounded to one decimal place, `None` for an empty set.
pub fn summarize(records: &[RatingRecord]) -> RatingSummary {
    let count = records.len() as u64;
    let average = (count > 0).then(|| {
        let sum: u64 = records.iter().map(|r| u64::from(r.value)).sum();
        (sum as f64 / count as f64 * 10.0).round() / 10.0
    });
    RatingSummary { average, count }
}

pub struct RatingAggregator {
    catalog: Arc<Catalog>,
    repo: Arc<dyn RatingRepo>,
    identity: Arc<IdentityStore>,
}

impl RatingAggregator {
    pub fn new(
        catalog: Arc<Catalog>,
        repo: Arc<dyn RatingRepo>,
        identity: Arc<IdentityStore>,
    ) -> Self {
        Self { catalog, repo, identity }
    }

    pub async fn rate(&self, bread_id: &str, user: Uuid, value: i64) -> Result<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(AppError::validation(format!(
                "rating must be a whole number from {MIN_RATING} to {MAX_RATING}"
            )));
        }
        if !self.catalog.contains(bread_id) {
            return Err(AppError::not_found("Bread", bread_id));
        }
        self.identity.require_member(user).await?;

        let record = RatingRecord {
            bread_id: bread_id.to_string(),
            user_id: user,
            value: value as u8,
            rated_at: Utc::now(),
        };
        self.repo.upsert_rating(record).await?;
        debug!(bread_id, user = %user, value, "rating stored");
        Ok(())
    }

    pub async fn summary_for(&self, bread_id: &str) -> Result<RatingSummary> {
        let records = self.repo.ratings_for_bread(bread_id).await?;
        Ok(summarize(&records))
    }

    pub async fn average_for(&self, bread_id: &str) -> Result<Option<f64>> {
        Ok(self.summary_for(bread_id).await?.average)
    }

    pub async fn count_for(&self, bread_id: &str) -> Result<u64> {
        Ok(self.summary_for(bread_id).await?.count)
    }

    pub async fn user_rating_for(&self, bread_id: &str, user: Uuid) -> Result<Option<u8>> {
        Ok(self.repo.get_rating(bread_id, user).await?.map(|r| r.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockIdentityProvider, MockRatingRepo, MockUserRepo};

    fn record(value: u8) -> RatingRecord {
        RatingRecord {
            bread_id: "rye".into(),
            user_id: Uuid::now_v7(),
            value,
            rated_at: Utc::now(),
        }
    }

    fn aggregator(repo: MockRatingRepo) -> RatingAggregator {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let identity = Arc::new(IdentityStore::new(
            catalog.clone(),
            Arc::new(MockUserRepo::new()),
            Arc::new(MockIdentityProvider::new()),
        ));
        RatingAggregator::new(catalog, Arc::new(repo), identity)
    }

    #[test]
    fn empty_summary_is_absent_not_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.average, None);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn average_rounds_to_one_decimal() {
        assert_eq!(summarize(&[record(4), record(5)]).average, Some(4.5));
        assert_eq!(summarize(&[record(4), record(2)]).average, Some(3.0));
        assert_eq!(summarize(&[record(5), record(4), record(4)]).average, Some(4.3));
    }

    #[tokio::test]
    async fn out_of_range_values_are_rejected_before_storage() {
        let mut repo = MockRatingRepo::new();
        repo.expect_upsert_rating().never();
        let ratings = aggregator(repo);
        for value in [0, 6, -1] {
            let err = ratings.rate("rye", Uuid::now_v7(), value).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn unknown_bread_is_not_found() {
        let mut repo = MockRatingRepo::new();
        repo.expect_upsert_rating().never();
        let err = aggregator(repo).rate("croissant", Uuid::now_v7(), 3).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }
}
