use sha2::{Digest, Sha256};

/// Hash the staff pre-shared key for storage and comparison
pub fn hash_psk(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a submitted password against the stored hash
pub fn verify_psk(password: &str, expected_hash: &str) -> bool {
    constant_time_eq(hash_psk(password).as_bytes(), expected_hash.as_bytes())
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_psk("clinic-staff-psk");
        assert!(verify_psk("clinic-staff-psk", &hash));
        assert!(!verify_psk("wrong", &hash));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hello!"));
    }
}
