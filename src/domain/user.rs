//! Registered accounts.
//!
//! The core persists accounts and their roles; credential verification and
//! token issuance belong to the external identity collaborator, which hands
//! the password hash in as an opaque string.

use serde::Serialize;
use uuid::Uuid;

use super::pvz::Role;

/// Unique identifier for a registered account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct UserId(pub Uuid);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        UserId(uuid)
    }
}

impl std::ops::Deref for UserId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Opaque, pre-hashed credential. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}
