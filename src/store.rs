/// Token persistence, keyed by user id.
///
/// One record per user per table: `put` is an atomic overwrite, so at most
/// one access token and one recovery token can exist for a user at any
/// time. Concurrent writers for the same user race last-writer-wins; the
/// store does not serialize sessions beyond the keyed upsert.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

/// The single live session token for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub token: String,
}

/// A pending recovery or welcome token. Both flows share this keyspace, so
/// the most recently minted of the two wins. Expiry lives inside the
/// signed token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryToken {
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub token: String,
}

#[async_trait]
pub trait AccessTokenStore: Send + Sync {
    async fn find(&self, user_id: i64) -> Result<Option<AccessToken>, AppError>;
    async fn put(&self, record: AccessToken) -> Result<(), AppError>;
    /// Returns whether a record existed.
    async fn delete(&self, user_id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait RecoveryTokenStore: Send + Sync {
    async fn find(&self, user_id: i64) -> Result<Option<RecoveryToken>, AppError>;
    async fn put(&self, record: RecoveryToken) -> Result<(), AppError>;
    async fn delete(&self, user_id: i64) -> Result<bool, AppError>;
}

#[derive(Default)]
pub struct InMemoryAccessTokenStore {
    records: RwLock<HashMap<i64, AccessToken>>,
}

impl InMemoryAccessTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessTokenStore for InMemoryAccessTokenStore {
    async fn find(&self, user_id: i64) -> Result<Option<AccessToken>, AppError> {
        Ok(self.records.read().unwrap().get(&user_id).cloned())
    }

    async fn put(&self, record: AccessToken) -> Result<(), AppError> {
        self.records.write().unwrap().insert(record.user_id, record);
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<bool, AppError> {
        Ok(self.records.write().unwrap().remove(&user_id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryRecoveryTokenStore {
    records: RwLock<HashMap<i64, RecoveryToken>>,
}

impl InMemoryRecoveryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecoveryTokenStore for InMemoryRecoveryTokenStore {
    async fn find(&self, user_id: i64) -> Result<Option<RecoveryToken>, AppError> {
        Ok(self.records.read().unwrap().get(&user_id).cloned())
    }

    async fn put(&self, record: RecoveryToken) -> Result<(), AppError> {
        self.records.write().unwrap().insert(record.user_id, record);
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<bool, AppError> {
        Ok(self.records.write().unwrap().remove(&user_id).is_some())
    }
}
