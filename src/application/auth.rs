use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credential")]
    Missing,
    #[error("invalid credential")]
    Invalid,
    #[error("no shared secret configured")]
    NotConfigured,
}

/// The single static credential guarding the compile endpoint.
#[derive(Clone)]
pub struct SharedSecret {
    hashed: Option<Vec<u8>>,
}

impl SharedSecret {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            hashed: secret.filter(|s| !s.is_empty()).map(hash_secret),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.hashed.is_some()
    }

    /// Check a presented credential. Without a configured secret every
    /// credential is refused.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let expected = self.hashed.as_ref().ok_or(AuthError::NotConfigured)?;
        let presented = presented.ok_or(AuthError::Missing)?;

        let hashed_input = hash_secret(presented);
        if expected.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}
