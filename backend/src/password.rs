use bcrypt::{hash, verify};

use crate::error::AppError;

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::PasswordError(e)
    })
}

/// Checks `candidate` against a stored bcrypt hash.
pub fn verify_password(candidate: &str, password_hash: &str) -> Result<bool, AppError> {
    Ok(verify(candidate, password_hash)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcrypt::DEFAULT_COST;

    const TEST_COST: u32 = 4;

    #[test]
    fn same_password_hashes_differently_and_both_verify() {
        let first = hash_password("password123", TEST_COST).unwrap();
        let second = hash_password("password123", TEST_COST).unwrap();

        assert_ne!(first, second);
        assert!(verify_password("password123", &first).unwrap());
        assert!(verify_password("password123", &second).unwrap());
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hashed = hash_password("password123", TEST_COST).unwrap();
        assert!(!verify_password("password124", &hashed).unwrap());
        assert_ne!(hashed, "password123");
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("password123", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn cost_is_encoded_in_the_hash() {
        let hashed = hash_password("pw", TEST_COST).unwrap();
        assert!(hashed.starts_with("$2b$04$"));
        assert!(DEFAULT_COST > TEST_COST);
    }
}
