//! Provisioned users (principals) and password hashing.

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// An identity allowed to log in, with its role.
///
/// Users are immutable once created; stores hand out clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    /// Argon2 PHC string.
    pub hashed_password: String,
    pub role: String,
}

impl User {
    /// Creates a user, hashing `password` with Argon2 and a random salt.
    ///
    /// # Errors
    ///
    /// Returns an error if the salt cannot be generated or hashing fails.
    pub fn new(username: &str, password: &str, role: &str) -> Result<Self> {
        Ok(Self {
            username: username.to_string(),
            hashed_password: hash_password(password)?,
            role: role.to_string(),
        })
    }

    /// Checks `password` against the stored hash.
    pub fn is_correct_password(&self, password: &str) -> bool {
        match PasswordHash::new(&self.hashed_password) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!("cannot generate salt: {e}"))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!("cannot encode salt: {e}"))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("cannot hash password: {e}"))?
        .to_string();
    Ok(phc)
}
