use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const ITERATIONS: u32 = 100_000;
const SALT_BYTES: usize = 16;

/// Derive a password hash with PBKDF2-HMAC-SHA256.
/// Generates a fresh random salt when none is supplied.
/// Returns (hex hash, hex salt); deterministic for a given salt.
pub fn hash_password(password: &str, salt: Option<&str>) -> (String, String) {
    let salt = match salt {
        Some(s) => s.to_string(),
        None => {
            let bytes: [u8; SALT_BYTES] = rand::random();
            hex::encode(bytes)
        }
    };

    let mut derived = [0u8; 32];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        ITERATIONS,
        &mut derived,
    );

    (hex::encode(derived), salt)
}

/// Recompute the hash with the stored salt and compare in constant time.
pub fn verify_password(stored_hash: &str, salt: &str, candidate: &str) -> bool {
    let (computed, _) = hash_password(candidate, Some(salt));
    constant_time_eq(computed.as_bytes(), stored_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verify_roundtrip() {
        let (hash, salt) = hash_password("correct horse", None);
        assert!(verify_password(&hash, &salt, "correct horse"));
    }

    #[test]
    fn wrong_password_fails() {
        let (hash, salt) = hash_password("correct horse", None);
        assert!(!verify_password(&hash, &salt, "battery staple"));
    }

    #[test]
    fn deterministic_for_fixed_salt() {
        let (h1, s1) = hash_password("pw", Some("00ff00ff00ff00ff00ff00ff00ff00ff"));
        let (h2, s2) = hash_password("pw", Some("00ff00ff00ff00ff00ff00ff00ff00ff"));
        assert_eq!(h1, h2);
        assert_eq!(s1, s2);
    }

    #[test]
    fn fresh_salts_differ() {
        let (_, s1) = hash_password("pw", None);
        let (_, s2) = hash_password("pw", None);
        assert_ne!(s1, s2);
        // 16 bytes, hex-encoded
        assert_eq!(s1.len(), 32);
    }
}
