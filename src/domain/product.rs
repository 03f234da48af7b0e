//! Product ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reception::ReceptionId;

/// Unique identifier for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct ProductId(pub Uuid);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for ProductId {
    fn from(uuid: Uuid) -> Self {
        ProductId(uuid)
    }
}

impl std::ops::Deref for ProductId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// One item registered within a reception's ledger.
///
/// Products form a strictly ordered sequence per reception: newest first by
/// `created_at`, with the store's insertion order breaking ties. Only the
/// most recent still-present product may be removed, and only while the
/// owning reception is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub created_at: DateTime<Utc>,
    /// Free-form category string ("электроника", "одежда", "обувь", ...).
    #[serde(rename = "type")]
    pub product_type: String,
    pub reception_id: ReceptionId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_serializes_category_under_type() {
        let product = Product {
            id: ProductId(Uuid::nil()),
            created_at: Utc::now(),
            product_type: "электроника".to_string(),
            reception_id: ReceptionId(Uuid::nil()),
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["type"], "электроника");
        assert!(value.get("receptionId").is_some());
        assert!(value.get("createdAt").is_some());
    }
}
