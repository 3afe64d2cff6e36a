//! Password hashing and verification using Argon2id.
//!
//! Hashing is a one-way boundary: the rest of the crate only ever sees the
//! PHC-formatted hash string and a yes/no verification answer.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::error;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password with Argon2id and a random per-password salt.
/// Returns a PHC-formatted string for storage.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(HashError)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Any failure answers `false`: a wrong password and an unparseable stored
/// hash are indistinguishable to the caller. The parse failure is logged
/// since it means a corrupt row, not a bad login attempt.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(error = %e, "Stored password hash is not valid PHC format");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Error from the hashing primitive.
#[derive(Debug)]
pub struct HashError(argon2::password_hash::Error);

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Password hashing failed: {}", self.0)
    }
}

impl std::error::Error for HashError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse battery", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let first = hash_password("same password").unwrap();
        let second = hash_password("same password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_corrupt_stored_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }
}
