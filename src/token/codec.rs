/// Token signing and verification.
///
/// HMAC-SHA-512 signed JWTs; the secret is injected at construction.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;

use crate::error::AppError;
use crate::token::Claims;

/// Why a token failed verification. Verification failures are terminal
/// for the call; they are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    Expired,
    BadSignature,
    Malformed,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationError::Expired => write!(f, "token has expired"),
            VerificationError::BadSignature => write!(f, "token signature mismatch"),
            VerificationError::Malformed => write!(f, "token is malformed"),
        }
    }
}

impl std::error::Error for VerificationError {}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs the given claims. Fails only on a serialization fault, which
    /// is not the caller's doing.
    pub fn issue(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS512), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verifies signature and expiry and returns the claims. Storage-free:
    /// a token that verifies here may still have been superseded, which is
    /// the store's call to make.
    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerificationError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    VerificationError::BadSignature
                }
                _ => VerificationError::Malformed,
            })
    }

    /// Decodes the numeric subject of a verified token.
    pub fn subject(&self, token: &str) -> Result<i64, VerificationError> {
        // A verified token with a non-numeric subject is treated as
        // malformed; we never issue one.
        self.verify(token)?
            .user_id()
            .map_err(|_| VerificationError::Malformed)
    }
}
