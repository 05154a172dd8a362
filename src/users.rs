/// User, role and privilege model plus the directory collaborators.
///
/// The authentication core only reads identity, credentials and the
/// role→privilege graph; full user management lives outside this crate
/// behind the `UserDirectory` trait.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Deleted,
}

impl UserStatus {
    /// Parses a status from its canonical upper-case name.
    pub fn from_name(name: &str) -> Result<Self, AppError> {
        match name {
            "ACTIVE" => Ok(UserStatus::Active),
            "INACTIVE" => Ok(UserStatus::Inactive),
            "DELETED" => Ok(UserStatus::Deleted),
            other => Err(AppError::BadRequest(format!(
                "{} is not a valid status",
                other
            ))),
        }
    }
}

/// Privilege identity. Equality is by id; the name is the authorization
/// lookup key.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Privilege {
    pub id: i64,
    pub name: String,
}

impl PartialEq for Privilege {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Role with its privilege set. The name is the unique compare key and is
/// matched case-insensitively.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub privileges: Vec<Privilege>,
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Role {
    pub fn privilege_names(&self) -> HashSet<String> {
        self.privileges.iter().map(|p| p.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: UserStatus,
    pub role: Role,
}

/// User-management collaborator consumed by the core.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn update_password(&self, id: i64, new_hash: &str) -> Result<(), AppError>;
}

/// Role/privilege collaborator. Unknown roles resolve to the empty set.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn privilege_names(&self, role_name: &str) -> Result<HashSet<String>, AppError>;
}

/// In-memory user directory, keyed by user id with a secondary email index.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<i64, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        let mut users = self.users.write().unwrap();
        users.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let users = self.users.read().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn update_password(&self, id: i64, new_hash: &str) -> Result<(), AppError> {
        let mut users = self.users.write().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::Internal(format!("no user with id {}", id)))?;
        user.password_hash = new_hash.to_string();
        Ok(())
    }
}

/// In-memory role directory, keyed by lower-cased role name.
#[derive(Default)]
pub struct InMemoryRoleDirectory {
    roles: RwLock<HashMap<String, HashSet<String>>>,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, role: &Role) {
        let mut roles = self.roles.write().unwrap();
        roles.insert(role.name.to_lowercase(), role.privilege_names());
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn privilege_names(&self, role_name: &str) -> Result<HashSet<String>, AppError> {
        let roles = self.roles.read().unwrap();
        Ok(roles
            .get(&role_name.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}
