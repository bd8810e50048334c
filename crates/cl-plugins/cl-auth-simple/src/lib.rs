//! # cl-auth-simple
//!
//! Argon2-based implementation of `IdentityProvider`.
//! Hashes are stored in PHC string form, so parameters and salt travel with them.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use cl_core::traits::IdentityProvider;

#[derive(Default)]
pub struct SimpleIdentityProvider {
    hasher: Argon2<'static>,
}

impl SimpleIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for SimpleIdentityProvider {
    /// Hashes `password` with a fresh random salt.
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    /// Unparseable hashes never verify.
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        self.hasher
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
