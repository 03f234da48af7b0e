//! In-memory implementation of the storage trait.
//!
//! Backs the test suite and embedded callers that don't need durability.
//! A single mutex serializes every operation, so the same invariants the
//! PostgreSQL schema enforces (one open reception per pickup point, the
//! ledger's open-status guard) hold under concurrent tasks here too.

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use async_trait::async_trait;

use crate::domain::product::{Product, ProductId};
use crate::domain::pvz::{Pvz, PvzId, Role};
use crate::domain::reception::{
    AnyReception, Open, Reception, ReceptionData, ReceptionId, ReceptionStatus,
};
use crate::domain::report::{PageRequest, PvzWithReceptions, ReceptionWithProducts, ReportFilter};
use crate::domain::user::{User, UserId};
use crate::error::{PriemkaError, Result};
use crate::storage::Storage;

#[derive(Debug, Clone)]
struct ReceptionRow {
    data: ReceptionData,
    status: ReceptionStatus,
}

#[derive(Debug, Clone)]
struct ProductRow {
    product: Product,
    /// Insertion-order tie-break, mirroring the `seq` column.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    pvzs: Vec<Pvz>,
    receptions: Vec<ReceptionRow>,
    products: Vec<ProductRow>,
    users: Vec<User>,
    next_seq: u64,
}

/// In-memory storage guarded by a single mutex.
#[derive(Default)]
pub struct InMemoryStorage {
    inner: Mutex<Inner>,
}

impl InMemoryStorage {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn last_product_index(&self, reception_id: ReceptionId) -> Option<usize> {
        self.products
            .iter()
            .enumerate()
            .filter(|(_, row)| row.product.reception_id == reception_id)
            // Later seq wins created_at ties: insertion order.
            .max_by_key(|(_, row)| (row.product.created_at, row.seq))
            .map(|(idx, _)| idx)
    }

    fn reception_status(&self, reception_id: ReceptionId) -> Option<ReceptionStatus> {
        self.receptions
            .iter()
            .find(|row| row.data.id == reception_id)
            .map(|row| row.status)
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_pvz(&self, city: &str) -> Result<Pvz> {
        let pvz = Pvz {
            id: PvzId(Uuid::new_v4()),
            registration_date: Utc::now(),
            city: city.to_string(),
        };
        self.inner.lock().pvzs.push(pvz.clone());
        Ok(pvz)
    }

    async fn list_pvzs(&self, page: PageRequest) -> Result<Vec<Pvz>> {
        let inner = self.inner.lock();
        let mut pvzs = inner.pvzs.clone();
        pvzs.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
        Ok(pvzs
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn create_reception(&self, pvz_id: PvzId) -> Result<Reception<Open>> {
        let mut inner = self.inner.lock();

        if !inner.pvzs.iter().any(|p| p.id == pvz_id) {
            return Err(PriemkaError::PvzNotFound(pvz_id));
        }
        // Check and insert under the same lock: the in-memory equivalent of
        // the partial unique index.
        let open_exists = inner
            .receptions
            .iter()
            .any(|row| row.data.pvz_id == pvz_id && row.status == ReceptionStatus::Open);
        if open_exists {
            return Err(PriemkaError::OpenReceptionExists(pvz_id));
        }

        let data = ReceptionData {
            id: ReceptionId(Uuid::new_v4()),
            pvz_id,
            created_at: Utc::now(),
        };
        inner.receptions.push(ReceptionRow {
            data,
            status: ReceptionStatus::Open,
        });
        Ok(Reception { state: Open, data })
    }

    async fn find_open_reception(&self, pvz_id: PvzId) -> Result<Option<Reception<Open>>> {
        let inner = self.inner.lock();
        Ok(inner
            .receptions
            .iter()
            .find(|row| row.data.pvz_id == pvz_id && row.status == ReceptionStatus::Open)
            .map(|row| Reception {
                state: Open,
                data: row.data,
            }))
    }

    async fn close_reception(&self, reception_id: ReceptionId) -> Result<()> {
        let mut inner = self.inner.lock();
        let row = inner
            .receptions
            .iter_mut()
            .find(|row| row.data.id == reception_id && row.status == ReceptionStatus::Open)
            .ok_or(PriemkaError::ReceptionClosed(reception_id))?;
        row.status = ReceptionStatus::Closed;
        Ok(())
    }

    async fn add_product(&self, reception_id: ReceptionId, product_type: &str) -> Result<Product> {
        let mut inner = self.inner.lock();

        if inner.reception_status(reception_id) != Some(ReceptionStatus::Open) {
            return Err(PriemkaError::ReceptionClosed(reception_id));
        }

        let product = Product {
            id: ProductId(Uuid::new_v4()),
            created_at: Utc::now(),
            product_type: product_type.to_string(),
            reception_id,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.products.push(ProductRow {
            product: product.clone(),
            seq,
        });
        Ok(product)
    }

    async fn get_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>> {
        let inner = self.inner.lock();
        Ok(inner
            .last_product_index(reception_id)
            .map(|idx| inner.products[idx].product.clone()))
    }

    async fn delete_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>> {
        let mut inner = self.inner.lock();

        if inner.reception_status(reception_id) != Some(ReceptionStatus::Open) {
            return Err(PriemkaError::ReceptionClosed(reception_id));
        }

        Ok(inner
            .last_product_index(reception_id)
            .map(|idx| inner.products.remove(idx).product))
    }

    async fn pvzs_with_receptions(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> Result<Vec<PvzWithReceptions>> {
        let inner = self.inner.lock();
        let now = Utc::now();

        let mut pvzs = inner.pvzs.clone();
        pvzs.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));

        let report = pvzs
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|pvz| {
                let mut rows: Vec<&ReceptionRow> = inner
                    .receptions
                    .iter()
                    .filter(|row| {
                        row.data.pvz_id == pvz.id && filter.contains(row.data.created_at, now)
                    })
                    .collect();
                rows.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));

                let receptions = rows
                    .into_iter()
                    .map(|row| {
                        let mut products: Vec<&ProductRow> = inner
                            .products
                            .iter()
                            .filter(|p| p.product.reception_id == row.data.id)
                            .collect();
                        products.sort_by(|a, b| {
                            (b.product.created_at, b.seq).cmp(&(a.product.created_at, a.seq))
                        });
                        ReceptionWithProducts {
                            reception: AnyReception::from_parts(row.data, row.status),
                            products: products.into_iter().map(|p| p.product.clone()).collect(),
                        }
                    })
                    .collect();

                PvzWithReceptions { pvz, receptions }
            })
            .collect();

        Ok(report)
    }

    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User> {
        let mut inner = self.inner.lock();

        if inner.users.iter().any(|u| u.email == email) {
            return Err(PriemkaError::UserExists(email.to_string()));
        }

        let user = User {
            id: UserId(Uuid::new_v4()),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }
}
