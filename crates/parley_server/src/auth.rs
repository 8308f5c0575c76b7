//! Bearer token authority and identity verification.
//!
//! Sync endpoints require a bearer token that decodes to exactly one
//! stable user id. Tokens are minted here after an external identity
//! credential (a Google id token) has been verified.
//!
//! ## Token format
//!
//! - 1 byte: user id length
//! - N bytes: user id (UTF-8)
//! - 8 bytes: issue time (Unix millis, big-endian)
//! - 32 bytes: HMAC-SHA256 signature over the preceding bytes
//!
//! The whole token is base64url-encoded for transport.

use crate::error::{ServerError, ServerResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_LEN: usize = 32;
const ISSUED_LEN: usize = 8;

/// A verified external identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Canonical user id, stable across devices and logins.
    pub user_id: String,
}

/// Verifies an external identity credential.
///
/// Production deployments verify the Google id token signature against
/// Google's published keys; that exchange is outside this crate. Any
/// implementation must map one credential to exactly one canonical
/// user id.
pub trait IdentityVerifier: Send + Sync {
    /// Verifies the credential and yields the canonical user id.
    fn verify(&self, id_token: &str) -> ServerResult<VerifiedIdentity>;
}

/// Verifier backed by a fixed credential table. Intended for tests.
#[derive(Debug, Default)]
pub struct StaticVerifier {
    users: HashMap<String, String>,
}

impl StaticVerifier {
    /// Creates an empty verifier that rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `id_token` as proof of `user_id`.
    pub fn allow(mut self, id_token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.users.insert(id_token.into(), user_id.into());
        self
    }
}

impl IdentityVerifier for StaticVerifier {
    fn verify(&self, id_token: &str) -> ServerResult<VerifiedIdentity> {
        self.users
            .get(id_token)
            .map(|user_id| VerifiedIdentity {
                user_id: user_id.clone(),
            })
            .ok_or_else(|| ServerError::Unauthorized("unknown identity credential".into()))
    }
}

/// Verifier that takes the credential itself as the user id.
///
/// For local development only; it performs no verification at all.
#[derive(Debug, Default)]
pub struct InsecureVerifier;

impl IdentityVerifier for InsecureVerifier {
    fn verify(&self, id_token: &str) -> ServerResult<VerifiedIdentity> {
        if id_token.is_empty() {
            return Err(ServerError::Unauthorized("empty identity credential".into()));
        }
        Ok(VerifiedIdentity {
            user_id: id_token.to_string(),
        })
    }
}

/// Mints and validates bearer tokens.
#[derive(Clone)]
pub struct TokenAuthority {
    secret: Vec<u8>,
    expiry: Duration,
}

impl TokenAuthority {
    /// Creates an authority with the given secret and token lifetime.
    pub fn new(secret: Vec<u8>, expiry: Duration) -> Self {
        Self { secret, expiry }
    }

    /// Issues a token for a user.
    pub fn issue(&self, user_id: &str) -> ServerResult<String> {
        self.issue_at(user_id, parley_model::now_ms())
    }

    fn issue_at(&self, user_id: &str, issued_ms: i64) -> ServerResult<String> {
        let user_bytes = user_id.as_bytes();
        if user_bytes.is_empty() || user_bytes.len() > u8::MAX as usize {
            return Err(ServerError::Internal(format!(
                "user id length {} out of range",
                user_bytes.len()
            )));
        }

        let mut data = Vec::with_capacity(1 + user_bytes.len() + ISSUED_LEN + SIGNATURE_LEN);
        data.push(user_bytes.len() as u8);
        data.extend_from_slice(user_bytes);
        data.extend_from_slice(&issued_ms.to_be_bytes());

        let signature = self.sign(&data)?;
        data.extend_from_slice(&signature);
        Ok(URL_SAFE_NO_PAD.encode(data))
    }

    /// Validates a token and returns the user id it carries.
    pub fn verify(&self, token: &str) -> ServerResult<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ServerError::Unauthorized("malformed token".into()))?;

        if bytes.len() < 1 + 1 + ISSUED_LEN + SIGNATURE_LEN {
            return Err(ServerError::Unauthorized("token too short".into()));
        }
        let user_len = bytes[0] as usize;
        let expected_len = 1 + user_len + ISSUED_LEN + SIGNATURE_LEN;
        if user_len == 0 || bytes.len() != expected_len {
            return Err(ServerError::Unauthorized("token length mismatch".into()));
        }

        let payload = &bytes[..1 + user_len + ISSUED_LEN];
        let signature = &bytes[1 + user_len + ISSUED_LEN..];

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        mac.update(payload);
        mac.verify_slice(signature)
            .map_err(|_| ServerError::Unauthorized("invalid token signature".into()))?;

        let user_id = std::str::from_utf8(&bytes[1..1 + user_len])
            .map_err(|_| ServerError::Unauthorized("token user id not UTF-8".into()))?
            .to_string();

        let mut issued_bytes = [0u8; ISSUED_LEN];
        issued_bytes.copy_from_slice(&bytes[1 + user_len..1 + user_len + ISSUED_LEN]);
        let issued_ms = i64::from_be_bytes(issued_bytes);

        let now = parley_model::now_ms();
        let expiry_ms = self.expiry.as_millis() as i64;
        if now > issued_ms.saturating_add(expiry_ms) {
            return Err(ServerError::Unauthorized("token expired".into()));
        }

        Ok(user_id)
    }

    fn sign(&self, data: &[u8]) -> ServerResult<[u8; SIGNATURE_LEN]> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().into())
    }
}
