//! PostgreSQL implementation of the storage trait.
//!
//! The schema (see `migrations/`) carries the invariants: a partial unique
//! index allows at most one `open` reception per pickup point, and every
//! guarded mutation here runs as a single conflict-aware statement, so
//! concurrent callers serialize inside PostgreSQL rather than in
//! application code.
//!
//! Queries are runtime-bound (no compile-time database required); rows are
//! decoded by column name.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::product::Product;
use crate::domain::pvz::{Pvz, PvzId, Role};
use crate::domain::reception::{
    AnyReception, Open, Reception, ReceptionData, ReceptionId, ReceptionStatus,
};
use crate::domain::report::{PageRequest, PvzWithReceptions, ReceptionWithProducts, ReportFilter};
use crate::domain::user::User;
use crate::error::{PriemkaError, Result};
use crate::storage::Storage;

/// PostgreSQL-backed storage.
///
/// # Example
/// ```ignore
/// use priemka::storage::postgres::PostgresStorage;
/// use sqlx::PgPool;
///
/// let pool = PgPool::connect("postgresql://localhost/priemka").await?;
/// let storage = PostgresStorage::new(pool);
/// storage.migrate().await?;
/// ```
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Create a new PostgreSQL storage over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations against this storage's pool.
    pub async fn migrate(&self) -> Result<()> {
        crate::migrator()
            .run(&self.pool)
            .await
            .map_err(|e| PriemkaError::Unavailable(anyhow!("failed to run migrations: {e}")))
    }
}

/// Map a query execution failure onto the store-unavailable error.
fn storage_err(context: &'static str, e: sqlx::Error) -> PriemkaError {
    PriemkaError::Unavailable(anyhow!("{context}: {e}"))
}

fn pvz_from_row(row: &PgRow) -> Result<Pvz> {
    Ok(Pvz {
        id: row.try_get("id").map_err(decode_err)?,
        registration_date: row.try_get("registration_date").map_err(decode_err)?,
        city: row.try_get("city").map_err(decode_err)?,
    })
}

fn reception_data_from_row(row: &PgRow) -> Result<ReceptionData> {
    Ok(ReceptionData {
        id: row.try_get("id").map_err(decode_err)?,
        pvz_id: row.try_get("pvz_id").map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id").map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(decode_err)?,
        product_type: row.try_get("type").map_err(decode_err)?,
        reception_id: row.try_get("reception_id").map_err(decode_err)?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(decode_err)?,
        email: row.try_get("email").map_err(decode_err)?,
        password_hash: row.try_get("password_hash").map_err(decode_err)?,
        role: row.try_get("role").map_err(decode_err)?,
    })
}

fn decode_err(e: sqlx::Error) -> PriemkaError {
    PriemkaError::Other(anyhow!("failed to decode row: {e}"))
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn create_pvz(&self, city: &str) -> Result<Pvz> {
        let row = sqlx::query(
            r#"
            INSERT INTO pvz (city)
            VALUES ($1)
            RETURNING id, registration_date, city
            "#,
        )
        .bind(city)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_err("failed to create pvz", e))?;

        pvz_from_row(&row)
    }

    async fn list_pvzs(&self, page: PageRequest) -> Result<Vec<Pvz>> {
        let rows = sqlx::query(
            r#"
            SELECT id, registration_date, city
            FROM pvz
            ORDER BY registration_date DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("failed to list pvzs", e))?;

        rows.iter().map(pvz_from_row).collect()
    }

    async fn create_reception(&self, pvz_id: PvzId) -> Result<Reception<Open>> {
        // The partial unique index on (pvz_id) WHERE status = 'open' makes
        // the existence check and the insert one atomic unit; two racing
        // callers cannot both insert.
        let row = sqlx::query(
            r#"
            INSERT INTO receptions (pvz_id)
            VALUES ($1)
            ON CONFLICT (pvz_id) WHERE status = 'open' DO NOTHING
            RETURNING id, created_at, pvz_id
            "#,
        )
        .bind(pvz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PriemkaError::PvzNotFound(pvz_id)
            }
            _ => storage_err("failed to create reception", e),
        })?;

        let row = row.ok_or(PriemkaError::OpenReceptionExists(pvz_id))?;
        let data = reception_data_from_row(&row)?;
        Ok(Reception { state: Open, data })
    }

    async fn find_open_reception(&self, pvz_id: PvzId) -> Result<Option<Reception<Open>>> {
        let row = sqlx::query(
            r#"
            SELECT id, created_at, pvz_id
            FROM receptions
            WHERE pvz_id = $1 AND status = 'open'
            "#,
        )
        .bind(pvz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("failed to find open reception", e))?;

        row.map(|row| {
            let data = reception_data_from_row(&row)?;
            Ok(Reception { state: Open, data })
        })
        .transpose()
    }

    async fn close_reception(&self, reception_id: ReceptionId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE receptions
            SET status = 'closed'
            WHERE id = $1 AND status = 'open'
            "#,
        )
        .bind(reception_id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_err("failed to close reception", e))?;

        if result.rows_affected() == 0 {
            // Already closed or never existed; the caller lost the race.
            return Err(PriemkaError::ReceptionClosed(reception_id));
        }
        Ok(())
    }

    async fn add_product(&self, reception_id: ReceptionId, product_type: &str) -> Result<Product> {
        // The open-status check runs inside the insert itself, so a
        // reception closing concurrently cannot admit one more product.
        let row = sqlx::query(
            r#"
            INSERT INTO products (type, reception_id)
            SELECT $1, r.id
            FROM receptions r
            WHERE r.id = $2 AND r.status = 'open'
            RETURNING id, created_at, type, reception_id
            "#,
        )
        .bind(product_type)
        .bind(reception_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("failed to add product", e))?;

        let row = row.ok_or(PriemkaError::ReceptionClosed(reception_id))?;
        product_from_row(&row)
    }

    async fn get_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, created_at, type, reception_id
            FROM products
            WHERE reception_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(reception_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("failed to get last product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn delete_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("failed to begin transaction", e))?;

        // Lock the reception row so the status stays 'open' for the span of
        // the delete; distinguishes "ledger empty" from "ledger frozen".
        let status: Option<ReceptionStatus> =
            sqlx::query_scalar(r#"SELECT status FROM receptions WHERE id = $1 FOR UPDATE"#)
                .bind(reception_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| storage_err("failed to lock reception", e))?;

        if status != Some(ReceptionStatus::Open) {
            return Err(PriemkaError::ReceptionClosed(reception_id));
        }

        let row = sqlx::query(
            r#"
            DELETE FROM products
            WHERE id = (
                SELECT id
                FROM products
                WHERE reception_id = $1
                ORDER BY created_at DESC, seq DESC
                LIMIT 1
            )
            RETURNING id, created_at, type, reception_id
            "#,
        )
        .bind(reception_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| storage_err("failed to delete last product", e))?;

        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit transaction", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn pvzs_with_receptions(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> Result<Vec<PvzWithReceptions>> {
        let pvzs = self.list_pvzs(page).await?;
        if pvzs.is_empty() {
            return Ok(Vec::new());
        }

        // Two set-valued queries instead of per-PVZ and per-reception
        // loops; ordering and filtering semantics are unchanged and the
        // round-trip count stays fixed.
        let pvz_ids: Vec<Uuid> = pvzs.iter().map(|p| p.id.0).collect();
        let end = filter.end.unwrap_or_else(Utc::now);

        let reception_rows = sqlx::query(
            r#"
            SELECT id, created_at, pvz_id, status
            FROM receptions
            WHERE pvz_id = ANY($1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND created_at <= $3
            ORDER BY created_at DESC
            "#,
        )
        .bind(&pvz_ids)
        .bind(filter.start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("failed to get receptions", e))?;

        let mut receptions: Vec<(ReceptionData, ReceptionStatus)> = Vec::new();
        for row in &reception_rows {
            let data = reception_data_from_row(row)?;
            let status: ReceptionStatus = row.try_get("status").map_err(decode_err)?;
            receptions.push((data, status));
        }

        let reception_ids: Vec<Uuid> = receptions.iter().map(|(data, _)| data.id.0).collect();
        let mut products_by_reception: HashMap<ReceptionId, Vec<Product>> = HashMap::new();
        if !reception_ids.is_empty() {
            let product_rows = sqlx::query(
                r#"
                SELECT id, created_at, type, reception_id
                FROM products
                WHERE reception_id = ANY($1)
                ORDER BY created_at DESC, seq DESC
                "#,
            )
            .bind(&reception_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("failed to get products", e))?;

            for row in &product_rows {
                let product = product_from_row(row)?;
                products_by_reception
                    .entry(product.reception_id)
                    .or_default()
                    .push(product);
            }
        }

        let mut receptions_by_pvz: HashMap<PvzId, Vec<ReceptionWithProducts>> = HashMap::new();
        for (data, status) in receptions {
            let products = products_by_reception.remove(&data.id).unwrap_or_default();
            receptions_by_pvz
                .entry(data.pvz_id)
                .or_default()
                .push(ReceptionWithProducts {
                    reception: AnyReception::from_parts(data, status),
                    products,
                });
        }

        Ok(pvzs
            .into_iter()
            .map(|pvz| {
                let receptions = receptions_by_pvz.remove(&pvz.id).unwrap_or_default();
                PvzWithReceptions { pvz, receptions }
            })
            .collect())
    }

    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, password_hash, role
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("failed to create user", e))?;

        let row = row.ok_or_else(|| PriemkaError::UserExists(email.to_string()))?;
        user_from_row(&row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, role
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("failed to find user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }
}
