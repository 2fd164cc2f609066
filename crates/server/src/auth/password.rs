//! Password hashing and verification.
//!
//! Uses bcrypt with the library default cost. Hashes are stored in the
//! standard modular crypt format so cost upgrades stay transparent.

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Verify a password against a stored hash.
///
/// Returns false for wrong passwords and for malformed hashes.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("nurse-station-7!").expect("hashing should succeed");
        assert!(hash.starts_with("$2"));
        assert!(verify_password("nurse-station-7!", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let h1 = hash_password("same-password").unwrap();
        let h2 = hash_password("same-password").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("same-password", &h1));
        assert!(verify_password("same-password", &h2));
    }

    #[test]
    fn malformed_hash_verifies_false_without_panicking() {
        assert!(!verify_password("password", ""));
        assert!(!verify_password("password", "not-a-bcrypt-hash"));
    }
}
