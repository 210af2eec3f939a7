//! Password hashing for signup and signin.
//!
//! Hashes are Argon2id PHC strings with a random salt per hash. The default argon2 parameters
//! are used for every hash; verification reads the parameters back out of the stored string.

use argon2::{
    Argon2,
    password_hash::{self, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct CredentialError(password_hash::Error);

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps a stored hash without checking its format. Malformed hashes never verify.
    #[must_use]
    pub fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}

pub fn hash_password(plaintext: &str) -> Result<PasswordHash, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(CredentialError)?;

    Ok(PasswordHash(hash.to_string()))
}

#[must_use]
pub fn verify_password(plaintext: &str, hash: &PasswordHash) -> bool {
    let Ok(parsed_hash) = password_hash::PasswordHash::new(&hash.0) else {
        return false;
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed_hash)
        .is_ok()
}
