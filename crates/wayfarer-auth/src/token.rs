//! Signed bearer tokens.
//!
//! Tokens are self-describing: `wf1.<claims>.<signature>` where both
//! payload segments are unpadded URL-safe base64, the claims segment is
//! a JSON document, and the signature is HMAC-SHA256 over the literal
//! prefix `wf1.<claims>` under the server's secret key.
//!
//! Verification order matters: the signature is checked (in constant
//! time) before any claim is trusted, so an attacker-controlled `exp`
//! is never read from an unverified token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use wayfarer_core::{CredentialFailure, Role};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "wf1";

/// The claims embedded in a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the principal identifier.
    pub sub: String,
    /// The role recorded at issue time.
    pub role: Role,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Signs and verifies bearer tokens under a single secret key.
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Creates a signer from the server secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { key: secret.into() }
    }

    /// Issues a token for `sub` with the given role and lifetime,
    /// stamped with the current time.
    #[must_use]
    pub fn sign(&self, sub: &str, role: Role, ttl: Duration) -> String {
        self.sign_at(sub, role, Utc::now(), ttl)
    }

    /// Issues a token stamped with an explicit issue instant.
    #[must_use]
    pub fn sign_at(&self, sub: &str, role: Role, issued_at: DateTime<Utc>, ttl: Duration) -> String {
        let claims = Claims {
            sub: sub.to_owned(),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };
        // Claims is a plain struct of scalars; serialization cannot fail.
        let json = serde_json::to_vec(&claims).expect("claims serialize to JSON");
        let payload = format!("{TOKEN_VERSION}.{}", URL_SAFE_NO_PAD.encode(json));
        let sig = self.mac(payload.as_bytes());
        format!("{payload}.{}", URL_SAFE_NO_PAD.encode(sig))
    }

    /// Verifies a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialFailure> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token's structure, signature, and expiry at an
    /// explicit instant.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, CredentialFailure> {
        let mut parts = token.splitn(3, '.');
        let (version, claims_b64, sig_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(v), Some(c), Some(s)) => (v, c, s),
            _ => return Err(CredentialFailure::Malformed),
        };
        if version != TOKEN_VERSION {
            return Err(CredentialFailure::Malformed);
        }
        let presented_sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| CredentialFailure::Malformed)?;

        let payload = format!("{version}.{claims_b64}");
        let expected_sig = self.mac(payload.as_bytes());
        if expected_sig.ct_eq(&presented_sig).unwrap_u8() != 1 {
            return Err(CredentialFailure::InvalidSignature);
        }

        // Claims are only decoded once the signature is known good.
        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| CredentialFailure::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| CredentialFailure::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(CredentialFailure::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, data: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}
