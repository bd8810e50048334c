//! Domain services. Each one is a thin state machine or aggregation over the ports
//! in [`crate::traits`]; wiring happens once in [`Services::new`].

pub mod composer;
pub mod identity;
pub mod ratings;
pub mod submissions;

use crate::catalog::Catalog;
use crate::traits::{IdentityProvider, RatingRepo, SubmissionRepo, UserRepo};
use std::sync::Arc;

pub use composer::{BreadCard, ComposedBreadView, ContentComposer};
pub use identity::{IdentityStore, Registration};
pub use ratings::RatingAggregator;
pub use submissions::SubmissionQueue;

/// Every service, wired over one set of ports.
pub struct Services {
    pub catalog: Arc<Catalog>,
    pub identity: Arc<IdentityStore>,
    pub submissions: Arc<SubmissionQueue>,
    pub ratings: Arc<RatingAggregator>,
    pub composer: Arc<ContentComposer>,
}

impl Services {
    pub fn new(
        catalog: Arc<Catalog>,
        submissions: Arc<dyn SubmissionRepo>,
        ratings: Arc<dyn RatingRepo>,
        users: Arc<dyn UserRepo>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let identity = Arc::new(IdentityStore::new(catalog.clone(), users, provider));
        let submissions = Arc::new(SubmissionQueue::new(
            catalog.clone(),
            submissions,
            identity.clone(),
        ));
        let ratings = Arc::new(RatingAggregator::new(catalog.clone(), ratings, identity.clone()));
        let composer = Arc::new(ContentComposer::new(
            catalog.clone(),
            submissions.clone(),
            ratings.clone(),
        ));
        Self { catalog, identity, submissions, ratings, composer }
    }
}
