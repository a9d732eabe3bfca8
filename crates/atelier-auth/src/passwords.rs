//! Salted, iterated SHA-256 password hashing.
//!
//! Stored form is `base64(salt)$base64(digest)`: a fresh 16-byte salt per
//! hash, digest = SHA-256(salt || password) folded over itself for a fixed
//! iteration count. Verification recomputes the digest from the stored salt
//! and compares in constant time. Plaintext passwords never leave this
//! module's arguments and are never stored or logged.

use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;
const ITERATIONS: u32 = 10_000;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let digest = iterated_digest(password.as_bytes(), &salt);
    let engine = &base64::engine::general_purpose::STANDARD;
    format!("{}${}", engine.encode(salt), engine.encode(digest))
}

/// Check a plaintext password against a stored hash.
///
/// A stored value that does not parse as `salt$digest` verifies as `false`
/// rather than erroring, so a corrupt row behaves like a wrong password.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = decode_stored(stored) else {
        return false;
    };
    let digest = iterated_digest(password.as_bytes(), &salt);
    constant_time_eq(&digest, &expected)
}

fn iterated_digest(password: &[u8], salt: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password);
    let mut digest: [u8; 32] = hasher.finalize().into();
    for _ in 1..ITERATIONS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        digest = hasher.finalize().into();
    }
    digest
}

fn decode_stored(stored: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let (salt_b64, digest_b64) = stored.split_once('$')?;
    let engine = &base64::engine::general_purpose::STANDARD;
    let salt = engine.decode(salt_b64).ok()?;
    let digest = engine.decode(digest_b64).ok()?;
    Some((salt, digest))
}

/// Compare two byte slices without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
