//! # Identity Store
//!
//! Owns user accounts and is the authorization boundary for every write
//! in the other services. Credentials are checked through an `IdentityProvider`.

use crate::catalog::Catalog;
use crate::error::{AppError, Result};
use crate::models::{NewUser, Role, UserProfile};
use crate::traits::{IdentityProvider, UserRepo};
use crate::validation::{non_blank, normalize_email, normalize_username, validate_password};
use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Sign-up form. `Debug` never prints the password.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .finish()
    }
}

pub struct IdentityStore {
    catalog: Arc<Catalog>,
    users: Arc<dyn UserRepo>,
    provider: Arc<dyn IdentityProvider>,
}

impl IdentityStore {
    pub fn new(
        catalog: Arc<Catalog>,
        users: Arc<dyn UserRepo>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self { catalog, users, provider }
    }

    pub async fn register(&self, form: Registration) -> Result<UserProfile> {
        self.create(form, Role::User).await
    }

    async fn create(&self, form: Registration, role: Role) -> Result<UserProfile> {
        let username = normalize_username(&form.username)?;
        let email = normalize_email(&form.email)?;
        validate_password(&form.password)?;

        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict(format!("username '{username}' is taken")));
        }
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!("email '{email}' is already registered")));
        }

        let user = NewUser {
            id: Uuid::now_v7(),
            username,
            email,
            display_name: non_blank(form.display_name.as_deref()),
            role,
            joined_at: Utc::now(),
            password_hash: self.provider.hash_password(&form.password)?,
        };
        let id = user.id;
        self.users.insert_user(user).await?;
        info!(user_id = %id, role = role.as_str(), "registered user");
        self.profile(id).await
    }

    /// Resolves a verified profile. Unknown email and wrong password are
    /// reported identically.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserProfile> {
        let email = email.trim().to_lowercase();
        let denied = || AppError::Unauthorized("invalid email or password".into());

        let user = self.users.find_user_by_email(&email).await?.ok_or_else(denied)?;
        let hash = self.users.password_hash(user.id).await?.ok_or_else(denied)?;
        if !self.provider.verify_password(password, &hash) {
            warn!(user_id = %user.id, "failed login");
            return Err(denied());
        }
        Ok(user)
    }

    pub async fn profile(&self, id: Uuid) -> Result<UserProfile> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    /// Any registered user. Anonymous or unknown actors are refused.
    pub async fn require_member(&self, id: Uuid) -> Result<UserProfile> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("unknown user {id}")))
    }

    pub async fn require_admin(&self, id: Uuid) -> Result<UserProfile> {
        let user = self.require_member(id).await?;
        if !user.is_admin() {
            warn!(user_id = %id, "admin action refused");
            return Err(AppError::Unauthorized(format!("user {id} is not an admin")));
        }
        Ok(user)
    }

    pub async fn promote(&self, id: Uuid, role: Role) -> Result<UserProfile> {
        self.profile(id).await?;
        self.users.set_role(id, role).await?;
        info!(user_id = %id, role = role.as_str(), "role changed");
        self.profile(id).await
    }

    /// Makes sure an admin account exists for `email`, creating it if needed.
    pub async fn ensure_admin(&self, form: Registration) -> Result<UserProfile> {
        let email = normalize_email(&form.email)?;
        match self.users.find_user_by_email(&email).await? {
            Some(user) if user.is_admin() => Ok(user),
            Some(user) => self.promote(user.id, Role::Admin).await,
            None => self.create(form, Role::Admin).await,
        }
    }

    pub async fn favorite(&self, id: Uuid, bread_id: &str) -> Result<()> {
        self.check_favorite_target(id, bread_id).await?;
        self.users.add_favorite(id, bread_id).await?;
        Ok(())
    }

    pub async fn unfavorite(&self, id: Uuid, bread_id: &str) -> Result<()> {
        self.check_favorite_target(id, bread_id).await?;
        self.users.remove_favorite(id, bread_id).await?;
        Ok(())
    }

    async fn check_favorite_target(&self, id: Uuid, bread_id: &str) -> Result<()> {
        self.profile(id).await?;
        if !self.catalog.contains(bread_id) {
            return Err(AppError::not_found("Bread", bread_id));
        }
        Ok(())
    }
}
