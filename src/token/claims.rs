/// Token claims (RFC 7519 subset plus the embedded user snapshot).

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::users::User;

/// Version of the embedded snapshot layout. Bump when the snapshot shape
/// changes so stale payloads are detectable after a deploy.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Token type tag carried in the claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    Bearer,
    Recovery,
}

/// Denormalized copy of the user taken at issuance time. Authorization
/// checks re-fetch current privileges instead of trusting this copy; it
/// exists so token consumers can display identity without a directory
/// round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub schema_version: u32,
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub privileges: Vec<String>,
}

impl UserSnapshot {
    pub fn of(user: &User) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.name.clone(),
            privileges: user.role.privileges.iter().map(|p| p.name.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Token type tag ("BEARER" | "RECOVERY")
    pub typ: TokenKind,
    /// Subject (numeric user id serialized as a string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token id. Guarantees two tokens minted for the same subject within
    /// the same second still differ, since supersession checks compare
    /// exact strings.
    pub jti: String,
    /// User snapshot, bearer tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSnapshot>,
}

impl Claims {
    /// Claims for an access token: 24h-class TTL, snapshot embedded.
    pub fn bearer(user: &User, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            typ: TokenKind::Bearer,
            sub: user.id.to_string(),
            iat: now,
            exp: now + ttl_seconds,
            jti: uuid::Uuid::new_v4().to_string(),
            user: Some(UserSnapshot::of(user)),
        }
    }

    /// Claims for a recovery or welcome token: subject only, no snapshot.
    pub fn recovery(user_id: i64, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            typ: TokenKind::Recovery,
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_seconds,
            jti: uuid::Uuid::new_v4().to_string(),
            user: None,
        }
    }

    /// Extracts the numeric user id from the subject.
    ///
    /// A non-numeric subject in a token that passed signature verification
    /// means we signed garbage, so the failure is internal rather than a
    /// client error.
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::Internal(format!("non-numeric token subject: {}", self.sub)))
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp()
    }
}
