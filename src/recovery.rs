/// Password recovery and welcome tokens.
///
/// Both flows mint short-lived RECOVERY tokens into the same per-user
/// keyspace, so a user never holds a pending recovery and welcome token at
/// once. A still-valid stored token is reused instead of re-minted, which
/// keeps repeated requests from producing a stream of distinct live links.

use std::sync::Arc;

use crate::auth::password;
use crate::email_client::EmailSender;
use crate::error::AppError;
use crate::store::{RecoveryToken, RecoveryTokenStore};
use crate::token::{Claims, TokenCodec};
use crate::users::{User, UserDirectory};

pub struct RecoveryService {
    tokens: Arc<dyn RecoveryTokenStore>,
    users: Arc<dyn UserDirectory>,
    emails: Arc<dyn EmailSender>,
    codec: TokenCodec,
    recovery_token_expiry: i64,
    welcome_token_expiry: i64,
}

impl RecoveryService {
    pub fn new(
        tokens: Arc<dyn RecoveryTokenStore>,
        users: Arc<dyn UserDirectory>,
        emails: Arc<dyn EmailSender>,
        codec: TokenCodec,
        recovery_token_expiry: i64,
        welcome_token_expiry: i64,
    ) -> Self {
        Self {
            tokens,
            users,
            emails,
            codec,
            recovery_token_expiry,
            welcome_token_expiry,
        }
    }

    /// Issue (or reuse) a recovery token for the given address and send
    /// the recovery email. Unknown addresses are a client error on this
    /// path; email transport failure surfaces as an internal error.
    pub async fn create_recovery_token(&self, email: &str) -> Result<RecoveryToken, AppError> {
        let user = self
            .users
            .user_by_email(email)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("email {} is not registered", email)))?;

        let record = self
            .reuse_or_mint(user.id, self.recovery_token_expiry)
            .await?;

        self.emails
            .send_recovery_email(&[user.email.clone()], &record.token)
            .await?;

        tracing::info!(user_id = user.id, "Recovery token ready");
        Ok(record)
    }

    /// Issue (or reuse) a welcome token for a freshly created user and
    /// send the welcome email. Delivery is best effort: a transport
    /// failure is logged and the token stays valid, so the user can still
    /// be sent a recovery link later. Rolling back the user itself is the
    /// creating caller's compensating action.
    pub async fn create_welcome_token(&self, user: &User) -> Result<RecoveryToken, AppError> {
        let record = self
            .reuse_or_mint(user.id, self.welcome_token_expiry)
            .await?;

        if let Err(e) = self
            .emails
            .send_welcome_email(&[user.email.clone()], &user.name, &record.token)
            .await
        {
            tracing::warn!(user_id = user.id, error = %e, "Welcome email delivery failed");
        }

        tracing::info!(user_id = user.id, "Welcome token ready");
        Ok(record)
    }

    /// Is this recovery token still usable? Requires all three: the
    /// signature verifies, a record exists for the subject, and the
    /// presented string equals the stored one.
    pub async fn validate_token(&self, token: &str) -> bool {
        let user_id = match self.codec.subject(token) {
            Ok(id) => id,
            Err(_) => return false,
        };

        match self.tokens.find(user_id).await {
            Ok(Some(record)) => record.token == token,
            _ => false,
        }
    }

    /// Consume a recovery token to set a new password.
    ///
    /// Exact string equality against the stored record is what makes the
    /// token single-use: once consumed and deleted, a replay with the same
    /// still-unexpired token fails the lookup.
    pub async fn change_user_password(
        &self,
        token: &str,
        new_raw_password: &str,
    ) -> Result<(), AppError> {
        let user_id = self
            .codec
            .subject(token)
            .map_err(|_| AppError::Unauthorized(None))?;

        let record = self
            .tokens
            .find(user_id)
            .await?
            .filter(|found| found.token == token)
            .ok_or(AppError::Unauthorized(None))?;

        let new_hash = password::encode(new_raw_password)?;
        self.users
            .update_password(user_id, &new_hash)
            .await
            .map_err(|e| {
                tracing::error!(user_id = user_id, error = %e, "Password update failed");
                AppError::Internal("could not update password".to_string())
            })?;

        self.tokens.delete(record.user_id).await?;
        tracing::info!(user_id = user_id, "Password changed, recovery token consumed");
        Ok(())
    }

    async fn reuse_or_mint(&self, user_id: i64, ttl_seconds: i64) -> Result<RecoveryToken, AppError> {
        if let Some(existing) = self.tokens.find(user_id).await? {
            if self.codec.verify(&existing.token).is_ok() {
                return Ok(existing);
            }
        }

        let token = self.codec.issue(&Claims::recovery(user_id, ttl_seconds))?;
        let record = RecoveryToken { user_id, token };
        self.tokens.put(record.clone()).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRecoveryTokenStore;
    use crate::users::{InMemoryUserDirectory, Privilege, Role, UserStatus};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    #[derive(Default)]
    struct RecordingEmailSender {
        recovery: Mutex<Vec<(Vec<String>, String)>>,
        welcome: Mutex<Vec<(Vec<String>, String, String)>>,
        fail: bool,
    }

    impl RecordingEmailSender {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl EmailSender for RecordingEmailSender {
        async fn send_recovery_email(
            &self,
            recipients: &[String],
            token: &str,
        ) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::Internal("smtp down".to_string()));
            }
            self.recovery
                .lock()
                .unwrap()
                .push((recipients.to_vec(), token.to_string()));
            Ok(())
        }

        async fn send_welcome_email(
            &self,
            recipients: &[String],
            name: &str,
            token: &str,
        ) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::Internal("smtp down".to_string()));
            }
            self.welcome.lock().unwrap().push((
                recipients.to_vec(),
                name.to_string(),
                token.to_string(),
            ));
            Ok(())
        }
    }

    fn sample_user() -> User {
        User {
            id: 3,
            email: "u1@example.com".to_string(),
            name: "u1".to_string(),
            password_hash: password::encode("OldPassword1").unwrap(),
            status: UserStatus::Active,
            role: Role {
                id: 1,
                name: "CLIENT".to_string(),
                privileges: vec![Privilege {
                    id: 1,
                    name: "GET_CLIENT".to_string(),
                }],
            },
        }
    }

    struct Fixture {
        service: RecoveryService,
        tokens: Arc<InMemoryRecoveryTokenStore>,
        users: Arc<InMemoryUserDirectory>,
        emails: Arc<RecordingEmailSender>,
        codec: TokenCodec,
    }

    fn fixture_with(emails: RecordingEmailSender) -> Fixture {
        let tokens = Arc::new(InMemoryRecoveryTokenStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        users.insert(sample_user());
        let emails = Arc::new(emails);
        let codec = TokenCodec::new(SECRET);

        let service = RecoveryService::new(
            tokens.clone(),
            users.clone(),
            emails.clone(),
            codec.clone(),
            1800,
            2592000,
        );

        Fixture {
            service,
            tokens,
            users,
            emails,
            codec,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingEmailSender::default())
    }

    #[tokio::test]
    async fn unknown_email_is_a_bad_request() {
        let f = fixture();
        let err = f
            .service
            .create_recovery_token("nobody@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn repeated_requests_reuse_the_pending_token() {
        let f = fixture();

        let first = f.service.create_recovery_token("u1@example.com").await.unwrap();
        let second = f.service.create_recovery_token("u1@example.com").await.unwrap();

        assert_eq!(first.token, second.token);
        // Both requests still sent an email carrying the same token.
        let sent = f.emails.recovery.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, sent[1].1);
    }

    #[tokio::test]
    async fn expired_pending_token_is_replaced() {
        let f = fixture();

        let expired = f.codec.issue(&Claims::recovery(3, -60)).unwrap();
        f.tokens
            .put(RecoveryToken {
                user_id: 3,
                token: expired.clone(),
            })
            .await
            .unwrap();

        let fresh = f.service.create_recovery_token("u1@example.com").await.unwrap();
        assert_ne!(fresh.token, expired);
        assert!(f.codec.verify(&fresh.token).is_ok());
    }

    #[tokio::test]
    async fn recovery_email_failure_surfaces_as_internal() {
        let f = fixture_with(RecordingEmailSender::failing());

        let err = f
            .service
            .create_recovery_token("u1@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn welcome_email_failure_is_swallowed() {
        let f = fixture_with(RecordingEmailSender::failing());

        let record = f
            .service
            .create_welcome_token(&sample_user())
            .await
            .expect("welcome delivery is best effort");
        assert!(f.service.validate_token(&record.token).await);
    }

    #[tokio::test]
    async fn welcome_and_recovery_share_the_keyspace() {
        let f = fixture();

        let welcome = f.service.create_welcome_token(&sample_user()).await.unwrap();
        // A still-valid welcome token is reused rather than replaced.
        let recovery = f.service.create_recovery_token("u1@example.com").await.unwrap();

        assert_eq!(welcome.token, recovery.token);
        assert_eq!(f.emails.welcome.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn change_password_consumes_the_token() {
        let f = fixture();
        let record = f.service.create_recovery_token("u1@example.com").await.unwrap();

        f.service
            .change_user_password(&record.token, "NewPassword1")
            .await
            .unwrap();

        let user = f.users.user_by_id(3).await.unwrap().unwrap();
        assert!(password::matches("NewPassword1", &user.password_hash).unwrap());
        assert!(f.tokens.find(3).await.unwrap().is_none());

        // Replay with the same cryptographically valid token fails.
        let err = f
            .service
            .change_user_password(&record.token, "OtherPassword1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn change_password_with_a_superseded_token_is_unauthorized() {
        let f = fixture();
        let old = f.service.create_recovery_token("u1@example.com").await.unwrap();

        // Overwrite with a newer token for the same user.
        f.tokens
            .put(RecoveryToken {
                user_id: 3,
                token: f.codec.issue(&Claims::recovery(3, 1800)).unwrap(),
            })
            .await
            .unwrap();

        let err = f
            .service
            .change_user_password(&old.token, "NewPassword1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn change_password_with_garbage_token_is_unauthorized() {
        let f = fixture();
        let err = f
            .service
            .change_user_password("garbage", "NewPassword1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn validate_token_requires_verification_and_exact_match() {
        let f = fixture();
        let record = f.service.create_recovery_token("u1@example.com").await.unwrap();

        assert!(f.service.validate_token(&record.token).await);
        assert!(!f.service.validate_token("garbage").await);

        // Verifies cryptographically but is not the stored string.
        let other = f.codec.issue(&Claims::recovery(3, 1800)).unwrap();
        assert!(!f.service.validate_token(&other).await);
    }
}
