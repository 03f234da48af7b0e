//! State transitions for intake sessions using the typestate pattern.
//!
//! ```text
//! (storage create) ──> Reception<Open> ──close()──> Reception<Closed>
//! ```
//!
//! `Closed` is terminal: no method exists to leave it, so reopening is
//! unrepresentable. The close transition persists through the store's
//! status-guarded update, which makes a lost double-close race surface as
//! an error instead of silently rewriting a closed row.

use crate::error::Result;
use crate::storage::Storage;

use super::state::{Closed, Open, Reception};

impl Reception<Open> {
    /// Close this reception.
    ///
    /// The store flips the status only if the row is still `open`; losing
    /// that race yields [`ReceptionClosed`](crate::PriemkaError::ReceptionClosed).
    /// On success the ledger is frozen — existing products are retained for
    /// history, and no further products can be added or removed.
    pub async fn close<S: Storage + ?Sized>(self, storage: &S) -> Result<Reception<Closed>> {
        storage.close_reception(self.data.id).await?;

        tracing::info!(
            reception_id = %self.data.id,
            pvz_id = %self.data.pvz_id,
            "Closed reception"
        );

        Ok(Reception {
            data: self.data,
            state: Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ErrorKind, PriemkaError};
    use crate::storage::memory::InMemoryStorage;
    use crate::storage::Storage;

    #[tokio::test]
    async fn close_transition_persists_closed_status() {
        let storage = InMemoryStorage::new();
        let pvz = storage.create_pvz("Москва").await.unwrap();
        let reception = storage.create_reception(pvz.id).await.unwrap();

        let closed = reception.close(&storage).await.unwrap();

        assert!(storage
            .find_open_reception(pvz.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(closed.data.pvz_id, pvz.id);
    }

    #[tokio::test]
    async fn losing_the_close_race_is_a_conflict() {
        let storage = InMemoryStorage::new();
        let pvz = storage.create_pvz("Казань").await.unwrap();
        let reception = storage.create_reception(pvz.id).await.unwrap();

        // Two handles to the same open reception; the second close loses.
        let stale = reception.clone();
        reception.close(&storage).await.unwrap();

        let err = stale.close(&storage).await.unwrap_err();
        assert!(matches!(err, PriemkaError::ReceptionClosed(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
