//! Pickup points and caller roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pickup point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct PvzId(pub Uuid);

impl std::fmt::Display for PvzId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for PvzId {
    fn from(uuid: Uuid) -> Self {
        PvzId(uuid)
    }
}

impl std::ops::Deref for PvzId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A pickup point where intake sessions occur.
///
/// Immutable after creation; the registry never deletes one. The city is
/// validated against the configured allow-list before the store is reached,
/// so every persisted record carries a canonical location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pvz {
    pub id: PvzId,
    pub registration_date: DateTime<Utc>,
    pub city: String,
}

/// Pre-authenticated caller role, supplied by the external identity
/// collaborator.
///
/// Threaded explicitly into every role-constrained operation; the core keeps
/// no ambient request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "text", rename_all = "lowercase")
)]
pub enum Role {
    Moderator,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Moderator => "moderator",
            Role::Employee => "employee",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::PriemkaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moderator" => Ok(Role::Moderator),
            "employee" => Ok(Role::Employee),
            other => Err(crate::error::PriemkaError::InvalidInput(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pvz_id_displays_short_form() {
        let id = PvzId(Uuid::nil());
        assert_eq!(id.to_string(), "00000000");
    }

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn pvz_serializes_with_stable_field_names() {
        let pvz = Pvz {
            id: PvzId(Uuid::nil()),
            registration_date: Utc::now(),
            city: "Москва".to_string(),
        };
        let value = serde_json::to_value(&pvz).unwrap();
        assert!(value.get("id").is_some());
        assert!(value.get("registrationDate").is_some());
        assert_eq!(value["city"], "Москва");
    }
}
