//! HMAC-SHA-256 capability signing for origin resource paths.
//!
//! The capability is the triple `(resource_path, expires_at, signature)`,
//! carried on the wire as `exp`/`sig` query parameters.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// A resource path plus the deadline its capability was minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPath {
    pub resource_path: String,
    pub expires_at: i64,
}

impl SignedPath {
    /// Render as the `exp=...&sig=...` query string appended to URLs.
    pub fn as_query(&self, signature: &str) -> String {
        format!("exp={}&sig={}", self.expires_at, signature)
    }
}

/// Mints and verifies short-lived HMAC capabilities over resource paths.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

fn mac_hex(secret: &[u8], resource_path: &str, expires_at: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(resource_path.as_bytes());
    mac.update(expires_at.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

impl Signer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// Mint a capability for `resource_path`, valid for `ttl_seconds` from now.
    pub fn sign(&self, resource_path: &str, ttl_seconds: i64) -> (SignedPath, String) {
        let expires_at = now_secs() + ttl_seconds;
        let signature = mac_hex(&self.secret, resource_path, expires_at);
        (
            SignedPath {
                resource_path: resource_path.to_string(),
                expires_at,
            },
            signature,
        )
    }

    /// Verify a capability. False if expired (strict: `expires_at <= now`)
    /// or if the signature does not match — no partial trust, no grace window.
    pub fn verify(&self, resource_path: &str, expires_at: i64, signature: &str) -> bool {
        if expires_at <= now_secs() {
            return false;
        }

        let expected = mac_hex(&self.secret, resource_path, expires_at);
        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }

    /// Build the full capability URL: `{base}{resource_path}?exp=..&sig=..`.
    pub fn build_url(&self, base: &str, signed_path: &SignedPath, signature: &str) -> String {
        let base = base.trim_end_matches('/');
        format!(
            "{base}{}?{}",
            signed_path.resource_path,
            signed_path.as_query(signature)
        )
    }
}

/// Constant-time byte comparison, independent of early-exit on length so
/// that this function's own branch doesn't leak timing for the common case
/// (mismatched-length signatures from malformed hex).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_succeeds_within_ttl() {
        let signer = Signer::new("top-secret");
        let (signed, sig) = signer.sign("/tracks/a/b/transcoded/master.m3u8", 300);
        assert!(signer.verify(&signed.resource_path, signed.expires_at, &sig));
    }

    #[test]
    fn verify_fails_once_expired() {
        let signer = Signer::new("top-secret");
        let path = "/tracks/a/b/transcoded/master.m3u8";
        let (signed, sig) = signer.sign(path, -1);
        assert!(!signer.verify(path, signed.expires_at, &sig));
    }

    #[test]
    fn verify_fails_for_wrong_path() {
        let signer = Signer::new("top-secret");
        let (signed, sig) = signer.sign("/tracks/a/b/transcoded/master.m3u8", 300);
        assert!(!signer.verify("/tracks/a/b/transcoded/other.m3u8", signed.expires_at, &sig));
    }

    #[test]
    fn verify_fails_for_tampered_signature() {
        let signer = Signer::new("top-secret");
        let (signed, mut sig) = signer.sign("/tracks/a/b/transcoded/master.m3u8", 300);
        sig.replace_range(0..2, "00");
        assert!(!signer.verify(&signed.resource_path, signed.expires_at, &sig));
    }

    #[test]
    fn different_secrets_produce_incompatible_signatures() {
        let a = Signer::new("secret-a");
        let b = Signer::new("secret-b");
        let (signed, sig) = a.sign("/tracks/a/b/transcoded/master.m3u8", 300);
        assert!(!b.verify(&signed.resource_path, signed.expires_at, &sig));
    }

    #[test]
    fn build_url_strips_trailing_slash_and_appends_query() {
        let signer = Signer::new("top-secret");
        let (signed, sig) = signer.sign("/tracks/a/b/transcoded/master.m3u8", 300);
        let url = signer.build_url("https://cdn.example.com/", &signed, &sig);
        assert!(url.starts_with("https://cdn.example.com/tracks/a/b/transcoded/master.m3u8?exp="));
        assert!(url.contains(&format!("exp={}", signed.expires_at)));
        assert!(url.contains(&format!("sig={sig}")));
    }

    #[test]
    fn signature_is_deterministic_for_same_inputs() {
        let signer = Signer::new("top-secret");
        let sig1 = mac_hex(&signer.secret, "/tracks/a/b/transcoded/master.m3u8", 1_000_300);
        let sig2 = mac_hex(&signer.secret, "/tracks/a/b/transcoded/master.m3u8", 1_000_300);
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
    }
}
