use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;

use super::config::HashConfig;
use super::errors::HashError;
use crate::utils::gen_random_bytes;

const DUMMY_PASSWORD: &str = "ntumiwa-dummy-password";

/// Argon2id password hasher producing PHC strings.
///
/// Holds a precomputed dummy hash so that a login for an unknown user costs the same
/// as one for a known user.
#[derive(Clone)]
pub struct PasswordHasher {
    inner: Arc<HasherInner>,
}

struct HasherInner {
    argon2: Argon2<'static>,
    salt_length: usize,
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.inner.argon2.params())
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    pub fn new(config: &HashConfig) -> Result<Self, HashError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            Some(config.key_length),
        )
        .map_err(|e| HashError::Params(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let zero_salt = SaltString::encode_b64(&vec![0u8; config.salt_length])
            .map_err(|e| HashError::Params(e.to_string()))?;
        let dummy_hash = argon2
            .hash_password(DUMMY_PASSWORD.as_bytes(), &zero_salt)
            .map_err(|e| HashError::Hash(e.to_string()))?
            .to_string();

        Ok(Self {
            inner: Arc::new(HasherInner {
                argon2,
                salt_length: config.salt_length,
                dummy_hash,
            }),
        })
    }

    /// Hashes `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt_bytes = gen_random_bytes(self.inner.salt_length)?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Hash(e.to_string()))?;

        Ok(self
            .inner
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?
            .to_string())
    }

    /// Checks `password` against a PHC string.
    ///
    /// A malformed hash is treated as a mismatch after running the dummy verification.
    pub fn verify(&self, encoded: &str, password: &str) -> bool {
        match PasswordHash::new(encoded) {
            Ok(parsed) => self
                .inner
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "Stored password hash is malformed");
                self.verify_dummy(password);
                false
            }
        }
    }

    /// Runs a verification against the dummy hash and discards the result.
    pub fn verify_dummy(&self, password: &str) {
        if let Ok(parsed) = PasswordHash::new(&self.inner.dummy_hash) {
            let _ = self
                .inner
                .argon2
                .verify_password(password.as_bytes(), &parsed);
        }
    }

    pub fn dummy_hash(&self) -> &str {
        &self.inner.dummy_hash
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: &str) -> Result<String, HashError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(&self, encoded: Option<String>, password: &str) -> Result<bool, HashError> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || match encoded {
            Some(encoded) => hasher.verify(&encoded, &password),
            None => {
                hasher.verify_dummy(&password);
                false
            }
        })
        .await
        .map_err(|e| HashError::Task(e.to_string()))
    }
}
