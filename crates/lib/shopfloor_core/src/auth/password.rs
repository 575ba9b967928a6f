//! Password hashing via bcrypt.

use super::AuthError;

/// bcrypt cost factor.
pub const BCRYPT_COST: u32 = 10;

/// One-way, verifiable password hash.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    fn verify(&self, password: &str, digest: &str) -> Result<bool, AuthError>;
}

/// bcrypt-backed [`PasswordHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new() -> Self {
        Self { cost: BCRYPT_COST }
    }

    /// Lower costs keep tests fast; bcrypt's minimum is 4.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    fn verify(&self, password: &str, digest: &str) -> Result<bool, AuthError> {
        bcrypt::verify(password, digest)
            .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = BcryptHasher::with_cost(4);
        let digest = hasher.hash("correct horse").unwrap();
        assert_ne!(digest, "correct horse");
        assert!(hasher.verify("correct horse", &digest).unwrap());
        assert!(!hasher.verify("wrong horse", &digest).unwrap());
    }

    #[test]
    fn verify_rejects_garbage_digest() {
        let hasher = BcryptHasher::with_cost(4);
        assert!(hasher.verify("pw", "not-a-bcrypt-hash").is_err());
    }
}
