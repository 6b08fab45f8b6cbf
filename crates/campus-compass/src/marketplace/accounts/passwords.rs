pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// bcrypt wrapper so the cost can be lowered in tests.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(password, self.cost)
    }

    /// A malformed stored hash never matches.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hasher = PasswordHasher::new(MIN_BCRYPT_COST);
        let hash = hasher.hash("admin123").expect("hash");
        assert_ne!(hash, "admin123");
        assert!(hasher.verify("admin123", &hash));
        assert!(!hasher.verify("admin124", &hash));
        assert!(!hasher.verify("admin123", "not-a-bcrypt-hash"));
    }

    #[test]
    fn cost_is_clamped_to_the_supported_range() {
        assert_eq!(PasswordHasher::new(1).cost, MIN_BCRYPT_COST);
        assert_eq!(PasswordHasher::new(40).cost, MAX_BCRYPT_COST);
        assert_eq!(PasswordHasher::new(10).cost, 10);
    }
}
