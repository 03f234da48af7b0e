//! Reception state types using the typestate pattern.
//!
//! An intake session progresses through exactly two states, enforced at
//! compile time: it is created `Open` and transitions once to `Closed`,
//! which is terminal.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::domain::pvz::PvzId;

/// Database status for filtering and querying receptions.
///
/// This enum represents the string values stored in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "text", rename_all = "lowercase")
)]
pub enum ReceptionStatus {
    Open,
    Closed,
}

/// Marker trait for valid reception states.
///
/// This trait enables the typestate pattern, ensuring that operations are
/// only performed on receptions in valid states.
pub trait ReceptionState: Send + Sync {}

/// Unique identifier for a reception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct ReceptionId(pub Uuid);

impl std::fmt::Display for ReceptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for ReceptionId {
    fn from(uuid: Uuid) -> Self {
        ReceptionId(uuid)
    }
}

impl std::ops::Deref for ReceptionId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// An intake session at a pickup point.
///
/// Uses the typestate pattern to ensure type-safe state transitions. The
/// generic parameter `T` represents the current state of the reception: the
/// product ledger only accepts a `Reception<Open>`, so "add product to a
/// closed reception" is unrepresentable in caller code.
#[derive(Debug, Clone)]
pub struct Reception<T: ReceptionState> {
    /// The current state of the reception.
    pub state: T,
    /// Identity and ownership, invariant across states.
    pub data: ReceptionData,
}

/// Identity fields shared by every reception state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceptionData {
    pub id: ReceptionId,
    pub pvz_id: PvzId,
    pub created_at: DateTime<Utc>,
}

/// Reception is accepting products.
#[derive(Debug, Clone, Copy)]
pub struct Open;

impl ReceptionState for Open {}

/// Reception is closed (terminal). Existing products are retained for
/// history; the ledger is frozen.
#[derive(Debug, Clone, Copy)]
pub struct Closed;

impl ReceptionState for Closed {}

/// Enum that can hold a reception in any state.
///
/// This is used for storage reads and API responses where receptions are
/// handled uniformly regardless of their current state.
#[derive(Debug, Clone)]
pub enum AnyReception {
    Open(Reception<Open>),
    Closed(Reception<Closed>),
}

impl AnyReception {
    /// Reconstruct a reception from its persisted status.
    pub fn from_parts(data: ReceptionData, status: ReceptionStatus) -> Self {
        match status {
            ReceptionStatus::Open => AnyReception::Open(Reception { state: Open, data }),
            ReceptionStatus::Closed => AnyReception::Closed(Reception {
                state: Closed,
                data,
            }),
        }
    }

    /// Get the reception ID regardless of state.
    pub fn id(&self) -> ReceptionId {
        self.data().id
    }

    /// Get the identity fields regardless of state.
    pub fn data(&self) -> &ReceptionData {
        match self {
            AnyReception::Open(r) => &r.data,
            AnyReception::Closed(r) => &r.data,
        }
    }

    /// Get the persisted status of the current state.
    pub fn status(&self) -> ReceptionStatus {
        match self {
            AnyReception::Open(_) => ReceptionStatus::Open,
            AnyReception::Closed(_) => ReceptionStatus::Closed,
        }
    }

    /// Check if this reception is accepting products.
    pub fn is_open(&self) -> bool {
        matches!(self, AnyReception::Open(_))
    }

    /// Try to extract as an open reception, consuming self.
    pub fn into_open(self) -> Option<Reception<Open>> {
        match self {
            AnyReception::Open(r) => Some(r),
            AnyReception::Closed(_) => None,
        }
    }
}

impl From<Reception<Open>> for AnyReception {
    fn from(r: Reception<Open>) -> Self {
        AnyReception::Open(r)
    }
}

impl From<Reception<Closed>> for AnyReception {
    fn from(r: Reception<Closed>) -> Self {
        AnyReception::Closed(r)
    }
}

// The wire shape is flat: {id, createdAt, pvzId, status}. Field names are
// stable API surface, so the typestate split stays an internal
// representation detail.
impl Serialize for AnyReception {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.data();
        let mut s = serializer.serialize_struct("Reception", 4)?;
        s.serialize_field("id", &data.id)?;
        s.serialize_field("createdAt", &data.created_at)?;
        s.serialize_field("pvzId", &data.pvz_id)?;
        s.serialize_field("status", &self.status())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> ReceptionData {
        ReceptionData {
            id: ReceptionId(Uuid::nil()),
            pvz_id: PvzId(Uuid::nil()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn from_parts_round_trips_status() {
        let open = AnyReception::from_parts(data(), ReceptionStatus::Open);
        assert!(open.is_open());
        assert_eq!(open.status(), ReceptionStatus::Open);

        let closed = AnyReception::from_parts(data(), ReceptionStatus::Closed);
        assert!(!closed.is_open());
        assert!(closed.into_open().is_none());
    }

    #[test]
    fn serializes_flat_with_stable_field_names() {
        let reception = AnyReception::from_parts(data(), ReceptionStatus::Closed);
        let value = serde_json::to_value(&reception).unwrap();
        assert!(value.get("id").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("pvzId").is_some());
        assert_eq!(value["status"], "closed");
    }
}
