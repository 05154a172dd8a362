/// Access session management and privilege evaluation.
///
/// Per-user session state machine: no token → `login` → one live token →
/// `logout` → no token. A stored token that no longer verifies is treated
/// as absent and replaced on the next login. Expiry is evaluated lazily at
/// verification time; nothing sweeps the store.

use std::sync::Arc;

use crate::auth::password;
use crate::error::AppError;
use crate::store::{AccessToken, AccessTokenStore};
use crate::token::{Claims, TokenCodec};
use crate::users::{RoleDirectory, User, UserDirectory};

pub struct AuthenticationService {
    tokens: Arc<dyn AccessTokenStore>,
    users: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleDirectory>,
    codec: TokenCodec,
    access_token_expiry: i64,
}

impl AuthenticationService {
    pub fn new(
        tokens: Arc<dyn AccessTokenStore>,
        users: Arc<dyn UserDirectory>,
        roles: Arc<dyn RoleDirectory>,
        codec: TokenCodec,
        access_token_expiry: i64,
    ) -> Self {
        Self {
            tokens,
            users,
            roles,
            codec,
            access_token_expiry,
        }
    }

    /// Authenticate by credentials and return the user's single live
    /// access token.
    ///
    /// A stored token that still verifies is returned unchanged, embedded
    /// snapshot included; token content is not refreshed on every login.
    /// Unknown email and wrong password are indistinguishable to the
    /// caller.
    pub async fn login(&self, email: &str, raw_password: &str) -> Result<AccessToken, AppError> {
        let user = self
            .users
            .user_by_email(email)
            .await?
            .ok_or(AppError::Unauthorized(None))?;

        if !password::matches(raw_password, &user.password_hash)? {
            return Err(AppError::Unauthorized(None));
        }

        if let Some(existing) = self.tokens.find(user.id).await? {
            if self.codec.verify(&existing.token).is_ok() {
                return Ok(existing);
            }
            // Stale record: expired or signed with a rotated secret.
            self.tokens.delete(user.id).await?;
        }

        self.issue_access_token(&user).await
    }

    /// End the session for the token's subject.
    ///
    /// A token that does not verify is a client error on this path, not an
    /// authorization failure; so is a token with no record to delete.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        let user_id = self
            .codec
            .subject(token)
            .map_err(|_| AppError::BadRequest("invalid access token".to_string()))?;

        let existed = self.tokens.delete(user_id).await?;
        if !existed {
            return Err(AppError::BadRequest("invalid access token".to_string()));
        }

        tracing::info!(user_id = user_id, "Session closed");
        Ok(())
    }

    /// Signature/expiry check only; does not touch storage.
    pub fn validate(&self, token: &str) -> bool {
        self.codec.verify(token).is_ok()
    }

    /// Confirm the token is the subject's current one of record and that
    /// the subject's role grants every required privilege.
    ///
    /// Possession of a well-formed unexpired token is not enough: a token
    /// that differs from the stored record has been superseded and is
    /// rejected. Granted privileges are re-fetched from the role directory
    /// rather than read from the embedded snapshot, so a role downgrade
    /// can never keep granting through a stale copy.
    pub async fn check_privileges(&self, token: &str, required: &[String]) -> Result<(), AppError> {
        let user_id = self
            .codec
            .subject(token)
            .map_err(|_| AppError::Unauthorized(None))?;

        let current = self
            .tokens
            .find(user_id)
            .await?
            .filter(|record| record.token == token)
            .ok_or_else(|| AppError::Unauthorized(Some("invalid access token".to_string())))?;
        debug_assert_eq!(current.user_id, user_id);

        if required.is_empty() {
            return Ok(());
        }

        let user = self
            .users
            .user_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized(None))?;
        let granted = self.roles.privilege_names(&user.role.name).await?;

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !granted.contains(*name))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(AppError::Forbidden { missing });
        }

        Ok(())
    }

    async fn issue_access_token(&self, user: &User) -> Result<AccessToken, AppError> {
        let claims = Claims::bearer(user, self.access_token_expiry);
        let token = self.codec.issue(&claims)?;

        let record = AccessToken {
            user_id: user.id,
            token,
        };
        self.tokens.put(record.clone()).await?;

        tracing::info!(user_id = user.id, "Access token issued");
        Ok(record)
    }
}
