use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, AppResult};

// 1. CredentialHasher Contract
/// CredentialHasher
///
/// The password hashing capability consumed by registration, login and user writes.
/// Implementations must be cheap to share; calls are CPU-bound and are dispatched to the
/// blocking pool by the handlers.
pub trait CredentialHasher: Send + Sync {
    /// Hashes `password` with a fresh random salt, returning a self-describing PHC string.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Returns true only when `password` matches `hash`. Malformed hashes never match.
    fn verify_password(&self, password: &str, hash: &str) -> bool;
}

// 2. The Argon2id Implementation
/// Argon2Hasher
///
/// Argon2id with a per-hash salt. The parameters are embedded in every hash, so hashes
/// produced with different costs verify interchangeably.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// The library's recommended cost (19 MiB, 2 passes).
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// A deliberately weak configuration for test suites. Never use in production.
    pub fn low_cost() -> Self {
        let params = Params::new(256, 1, 1, None).unwrap_or_default();
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Hashing(e.to_string()))
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("stored password hash is malformed: {}", e);
                false
            }
        }
    }
}

/// HasherState
///
/// The concrete type used to share the hashing capability across the application state.
pub type HasherState = Arc<dyn CredentialHasher>;

/// Runs a hash on the blocking pool.
pub async fn hash_blocking(hasher: HasherState, password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash_password(&password))
        .await
        .map_err(|e| AppError::Hashing(e.to_string()))?
}

/// Runs a verification on the blocking pool. A panicked task counts as a mismatch.
pub async fn verify_blocking(hasher: HasherState, password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = Argon2Hasher::low_cost();
        let hash = hasher.hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password("hunter22", &hash));
        assert!(!hasher.verify_password("hunter23", &hash));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let hasher = Argon2Hasher::low_cost();
        let first = hasher.hash_password("samepass").unwrap();
        let second = hasher.hash_password("samepass").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        let hasher = Argon2Hasher::low_cost();
        assert!(!hasher.verify_password("anything", ""));
        assert!(!hasher.verify_password("anything", "plaintext"));
    }

    #[test]
    fn test_cost_is_read_from_hash() {
        let hash = Argon2Hasher::low_cost().hash_password("portable").unwrap();
        assert!(Argon2Hasher::new().verify_password("portable", &hash));
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let hasher: HasherState = Arc::new(Argon2Hasher::low_cost());
        let hash = hash_blocking(hasher.clone(), "offloaded".to_string())
            .await
            .unwrap();
        assert!(verify_blocking(hasher, "offloaded".to_string(), hash).await);
    }
}
