//! Concurrency tests for the at-most-one-open reception invariant.

use std::sync::Arc;

use priemka::{
    ErrorKind, InMemoryStorage, PriemkaError, PvzService, ReportFilter, Role, Storage,
};

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn concurrent_create_reception_admits_exactly_one() {
    let service = Arc::new(PvzService::new(Arc::new(InMemoryStorage::new())));
    let pvz = service.create_pvz(Role::Moderator, "Москва").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.create_reception(Role::Employee, pvz.id).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => {
                assert!(matches!(err, PriemkaError::OpenReceptionExists(_)));
                assert_eq!(err.kind(), ErrorKind::Conflict);
                conflicts += 1;
            }
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);

    // The store observes exactly one reception, and it is open.
    let report = service
        .pvzs_with_receptions(Role::Moderator, ReportFilter::default(), None, None)
        .await
        .unwrap();
    assert_eq!(report[0].receptions.len(), 1);
    assert!(report[0].receptions[0].reception.is_open());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn concurrent_delete_last_product_never_double_frees() {
    let service = Arc::new(PvzService::new(Arc::new(InMemoryStorage::new())));
    let pvz = service.create_pvz(Role::Moderator, "Казань").await.unwrap();
    service
        .create_reception(Role::Employee, pvz.id)
        .await
        .unwrap();
    for i in 0..8 {
        service
            .add_product(Role::Employee, pvz.id, &format!("категория-{i}"))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.delete_last_product(Role::Employee, pvz.id).await
        }));
    }

    let mut deleted = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(product) => deleted.push(product.id),
            Err(err) => assert!(matches!(err, PriemkaError::NoProducts(_))),
        }
    }

    // Eight products existed; every successful delete removed a distinct one.
    assert_eq!(deleted.len(), 8);
    deleted.sort_by_key(|id| id.0);
    deleted.dedup();
    assert_eq!(deleted.len(), 8);
}

#[test_log::test(tokio::test)]
async fn ledger_guard_catches_the_close_race() {
    // Drive the stores directly: a caller that resolved the open reception,
    // then lost a race with close, is stopped by the ledger's own guard.
    let storage = InMemoryStorage::new();
    let pvz = storage.create_pvz("Москва").await.unwrap();
    let reception = storage.create_reception(pvz.id).await.unwrap();
    let reception_id = reception.data.id;

    reception.close(&storage).await.unwrap();

    let err = storage.add_product(reception_id, "одежда").await.unwrap_err();
    assert!(matches!(err, PriemkaError::ReceptionClosed(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
