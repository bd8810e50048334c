//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use cl_core::models::{Difficulty, Ingredient, RecipeDraft, TimeDraft, UserProfile};
use cl_core::services::{Registration, Services};
use cl_core::traits::IdentityProvider;
use cl_core::Catalog;
use cl_db_memory::MemoryStore;
use std::sync::Arc;

/// Cheap reversible hashing; argon2 itself is exercised in `identity.rs`.
pub struct PlainProvider;

impl IdentityProvider for PlainProvider {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        Ok(format!("plain${password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password)
    }
}

pub fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::builtin().expect("built-in catalog is valid"))
}

pub fn memory_services() -> Arc<Services> {
    let store = Arc::new(MemoryStore::new());
    Arc::new(Services::new(
        catalog(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(PlainProvider),
    ))
}

pub fn registration(name: &str) -> Registration {
    Registration {
        username: name.to_string(),
        email: format!("{name}@example.com"),
        password: "crumbs123".to_string(),
        display_name: Some(name.to_uppercase()),
    }
}

pub async fn member(services: &Services, name: &str) -> UserProfile {
    services.identity.register(registration(name)).await.expect("register member")
}

pub async fn admin(services: &Services, name: &str) -> UserProfile {
    services.identity.ensure_admin(registration(name)).await.expect("register admin")
}

pub fn draft(title: &str) -> RecipeDraft {
    RecipeDraft {
        title: title.to_string(),
        author: "Community Baker".to_string(),
        difficulty: Difficulty::Intermediate,
        time: TimeDraft::minutes(30, 120, 35),
        yield_desc: "2 loaves".to_string(),
        ingredients: vec![
            Ingredient { name: "Bread flour".into(), amount: "1 kg".into() },
            Ingredient { name: "Water".into(), amount: "700 g".into() },
        ],
        instructions: vec!["Mix".into(), "Proof".into(), "Bake".into()],
        tips: vec![],
    }
}
