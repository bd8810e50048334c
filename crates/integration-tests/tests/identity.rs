//! Accounts and roles, with the argon2 identity provider.

mod common;

use cl_auth_simple::SimpleIdentityProvider;
use cl_core::models::Role;
use cl_core::services::{Registration, Services};
use cl_core::AppError;
use cl_db_memory::MemoryStore;
use common::catalog;
use std::sync::Arc;

fn services() -> Services {
    let store = Arc::new(MemoryStore::new());
    Services::new(
        catalog(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(SimpleIdentityProvider::new()),
    )
}

fn form(username: &str, email: &str, password: &str) -> Registration {
    Registration {
        username: username.into(),
        email: email.into(),
        password: password.into(),
        display_name: None,
    }
}

#[tokio::test]
async fn register_then_login() {
    let services = services();
    let created = services
        .identity
        .register(form("  Mabel ", "Mabel@Bakery.test", "proofing"))
        .await
        .unwrap();
    assert_eq!(created.username, "Mabel");
    assert_eq!(created.email, "mabel@bakery.test");
    assert_eq!(created.role, Role::User);
    assert!(created.favorites.is_empty());

    let logged_in = services
        .identity
        .authenticate("MABEL@bakery.test", "proofing")
        .await
        .unwrap();
    assert_eq!(logged_in.id, created.id);

    let err = services
        .identity
        .authenticate("mabel@bakery.test", "Proofing")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    let err = services
        .identity
        .authenticate("nobody@bakery.test", "proofing")
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Unauthorized("invalid email or password".into()));
}

#[tokio::test]
async fn registration_is_validated() {
    let services = services();
    for bad in [
        form("ab", "a@b.test", "proofing"),
        form("mabel", "not-an-email", "proofing"),
        form("mabel", "m@b.test", "short"),
    ] {
        let err = services.identity.register(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{err:?}");
    }
}

#[tokio::test]
async fn duplicates_conflict_case_insensitively() {
    let services = services();
    services.identity.register(form("mabel", "m@b.test", "proofing")).await.unwrap();

    let err = services
        .identity
        .register(form("other", "M@B.test", "proofing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = services
        .identity
        .register(form("MABEL", "x@b.test", "proofing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn admin_bootstrap_is_idempotent_and_promotes() {
    let services = services();
    let user = services.identity.register(form("head", "head@b.test", "proofing")).await.unwrap();
    assert!(services.identity.require_admin(user.id).await.is_err());

    let promoted = services
        .identity
        .ensure_admin(form("head", "head@b.test", "proofing"))
        .await
        .unwrap();
    assert_eq!(promoted.id, user.id);
    assert_eq!(promoted.role, Role::Admin);

    let again = services
        .identity
        .ensure_admin(form("head", "head@b.test", "proofing"))
        .await
        .unwrap();
    assert_eq!(again.id, user.id);
    services.identity.require_admin(user.id).await.unwrap();
}

#[tokio::test]
async fn favorites_are_idempotent() {
    let services = services();
    let user = services.identity.register(form("mabel", "m@b.test", "proofing")).await.unwrap();

    services.identity.favorite(user.id, "pretzel").await.unwrap();
    services.identity.favorite(user.id, "pretzel").await.unwrap();
    services.identity.unfavorite(user.id, "naan").await.unwrap();
    let profile = services.identity.profile(user.id).await.unwrap();
    assert_eq!(profile.favorites.iter().collect::<Vec<_>>(), ["pretzel"]);

    services.identity.unfavorite(user.id, "pretzel").await.unwrap();
    services.identity.unfavorite(user.id, "pretzel").await.unwrap();
    assert!(services.identity.profile(user.id).await.unwrap().favorites.is_empty());

    let err = services.identity.favorite(user.id, "gingerbread").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
}
