//! Credential secret hashing and verification.
//!
//! Password and client-secret hashes use Argon2id in PHC string format.
//! Plaintext values exist only for the duration of the authentication
//! check; the stores only ever hold hashes.
//!
//! # Example
//!
//! ```
//! use tradewind_auth::secret::{hash_secret, verify_secret};
//!
//! let hash = hash_secret("pw123").unwrap();
//! assert!(hash.starts_with("$argon2id$"));
//! assert!(verify_secret("pw123", &hash));
//! assert!(!verify_secret("wrong", &hash));
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

/// Generate a cryptographically secure opaque secret.
///
/// 256-bit random value encoded as hexadecimal. Used for provisioning
/// machine-client secrets.
#[must_use]
pub fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash a secret for storage using Argon2id.
///
/// Uses a cryptographically secure random salt and default parameters;
/// the result is a PHC string suitable for row storage.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext secret against a stored PHC hash.
///
/// An unparseable hash verifies as `false` rather than erroring; a
/// corrupted row must never authenticate.
#[must_use]
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_secret("pw123").unwrap();
        assert!(verify_secret("pw123", &hash));
        assert!(!verify_secret("pw124", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_secret("pw123").unwrap();
        let b = hash_secret("pw123").unwrap();
        assert_ne!(a, b);
        assert!(verify_secret("pw123", &a));
        assert!(verify_secret("pw123", &b));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_secret("pw123", "not-a-phc-string"));
        assert!(!verify_secret("pw123", ""));
    }

    #[test]
    fn test_generated_secret_shape() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        let other = generate_secret();
        assert_ne!(secret, other);
    }
}
