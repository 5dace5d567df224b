//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Produces the one-time verifier/challenge pair that binds an authorization
//! code to the party that requested it. The verifier stays with the caller
//! between authorization-URL issuance and code exchange; only the challenge
//! travels in the authorization request.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// One-time verifier/challenge pair for a single authorization attempt.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair from the thread-local CSPRNG.
    ///
    /// The verifier is 64 random bytes encoded as URL-safe base64 without
    /// padding (86 characters, within RFC 7636's 43-128 range).
    pub fn generate() -> Self {
        let mut bytes = [0u8; 64];
        rand::rng().fill(&mut bytes);
        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
