//! Use-case layer composing the registry, the reception state machine and
//! the product ledger over a storage backend.
//!
//! This is the surface presentation layers call. Every role-constrained
//! operation takes the pre-authenticated caller [`Role`] as an explicit
//! parameter; the core carries no ambient request context. Role checks sit
//! immediately adjacent to the data access they guard.

use std::sync::Arc;

use crate::config::Config;
use crate::domain::product::Product;
use crate::domain::pvz::{Pvz, PvzId, Role};
use crate::domain::reception::{Closed, Open, Reception};
use crate::domain::report::{PageRequest, PvzWithReceptions, ReportFilter};
use crate::domain::user::User;
use crate::error::{PriemkaError, Result};
use crate::storage::Storage;

/// The intake service.
///
/// Generic over the storage backend so the same rules run against
/// PostgreSQL in production and the in-memory store in tests.
///
/// # Example
/// ```ignore
/// use priemka::{PvzService, storage::postgres::PostgresStorage};
///
/// let service = PvzService::new(Arc::new(PostgresStorage::new(pool)));
/// let pvz = service.create_pvz(Role::Moderator, "Москва").await?;
/// ```
pub struct PvzService<S> {
    storage: Arc<S>,
    config: Config,
}

impl<S: Storage> PvzService<S> {
    /// Create a service with the default configuration.
    ///
    /// Customize with `.with_config()` if needed.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            config: Config::default(),
        }
    }

    /// Set a custom configuration.
    ///
    /// This is a builder method that can be chained after `new()`.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Get the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a new pickup point. Moderator-only.
    #[tracing::instrument(skip(self))]
    pub async fn create_pvz(&self, role: Role, city: &str) -> Result<Pvz> {
        require(role, &[Role::Moderator], "create a pickup point")?;

        if !self.config.is_allowed_city(city) {
            return Err(PriemkaError::InvalidLocation(city.to_string()));
        }

        let pvz = self.storage.create_pvz(city).await?;
        tracing::info!(pvz_id = %pvz.id, city = %pvz.city, "Registered pickup point");
        Ok(pvz)
    }

    /// One page of pickup points, newest registration first.
    ///
    /// Out-of-range pagination input falls back to configured defaults.
    #[tracing::instrument(skip(self))]
    pub async fn list_pvzs(
        &self,
        role: Role,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<Vec<Pvz>> {
        require(
            role,
            &[Role::Moderator, Role::Employee],
            "list pickup points",
        )?;

        let page = PageRequest::normalize(page, per_page, &self.config);
        self.storage.list_pvzs(page).await
    }

    /// The unique open reception for a pickup point.
    ///
    /// Fails with [`NoOpenReception`](PriemkaError::NoOpenReception) when
    /// there is none — the user-visible reading of the store's empty
    /// lookup result.
    #[tracing::instrument(skip(self))]
    pub async fn open_reception(&self, pvz_id: PvzId) -> Result<Reception<Open>> {
        self.storage
            .find_open_reception(pvz_id)
            .await?
            .ok_or(PriemkaError::NoOpenReception(pvz_id))
    }

    /// Start a new intake session at a pickup point. Employee-only.
    ///
    /// The store treats the no-open-reception check and the insert as one
    /// atomic unit; a concurrent duplicate surfaces as
    /// [`OpenReceptionExists`](PriemkaError::OpenReceptionExists).
    #[tracing::instrument(skip(self))]
    pub async fn create_reception(&self, role: Role, pvz_id: PvzId) -> Result<Reception<Open>> {
        require(role, &[Role::Employee], "create a reception")?;

        let reception = self.storage.create_reception(pvz_id).await?;
        tracing::info!(
            reception_id = %reception.data.id,
            pvz_id = %pvz_id,
            "Opened reception"
        );
        Ok(reception)
    }

    /// Close the open reception at a pickup point. Employee-only.
    ///
    /// Resolves the target via the open-reception lookup, so "close a
    /// reception that doesn't exist" is a genuine
    /// [`NoOpenReception`](PriemkaError::NoOpenReception) failure and a
    /// double-close race is foreclosed by the store's status guard.
    #[tracing::instrument(skip(self))]
    pub async fn close_last_reception(
        &self,
        role: Role,
        pvz_id: PvzId,
    ) -> Result<Reception<Closed>> {
        require(role, &[Role::Employee], "close a reception")?;

        let reception = self.open_reception(pvz_id).await?;
        reception.close(self.storage.as_ref()).await
    }

    /// Register a product in the open reception at a pickup point.
    /// Employee-only.
    #[tracing::instrument(skip(self))]
    pub async fn add_product(
        &self,
        role: Role,
        pvz_id: PvzId,
        product_type: &str,
    ) -> Result<Product> {
        require(role, &[Role::Employee], "add a product")?;

        if product_type.trim().is_empty() {
            return Err(PriemkaError::InvalidInput(
                "product type must not be empty".to_string(),
            ));
        }

        let reception = self.open_reception(pvz_id).await?;
        let product = self.storage.add_product(reception.data.id, product_type).await?;
        tracing::info!(
            product_id = %product.id,
            reception_id = %product.reception_id,
            product_type = %product.product_type,
            "Added product"
        );
        Ok(product)
    }

    /// The most recently added product in the open reception at a pickup
    /// point.
    ///
    /// Latest `created_at` wins, insertion order breaking ties. Fails with
    /// [`NoProducts`](PriemkaError::NoProducts) on an empty ledger.
    #[tracing::instrument(skip(self))]
    pub async fn last_product(&self, pvz_id: PvzId) -> Result<Product> {
        let reception = self.open_reception(pvz_id).await?;
        self.storage
            .get_last_product(reception.data.id)
            .await?
            .ok_or(PriemkaError::NoProducts(reception.data.id))
    }

    /// Remove the most recently added product from the open reception at a
    /// pickup point. Employee-only.
    ///
    /// LIFO discipline is enforced by the ledger itself: the store only
    /// exposes an atomic delete of the most recent product, so out-of-order
    /// deletion is unrepresentable.
    #[tracing::instrument(skip(self))]
    pub async fn delete_last_product(&self, role: Role, pvz_id: PvzId) -> Result<Product> {
        require(role, &[Role::Employee], "delete a product")?;

        let reception = self.open_reception(pvz_id).await?;
        let product = self
            .storage
            .delete_last_product(reception.data.id)
            .await?
            .ok_or(PriemkaError::NoProducts(reception.data.id))?;

        tracing::info!(
            product_id = %product.id,
            reception_id = %product.reception_id,
            "Deleted last product"
        );
        Ok(product)
    }

    /// One page of pickup points with their receiving history, receptions
    /// date-filtered inclusively.
    #[tracing::instrument(skip(self))]
    pub async fn pvzs_with_receptions(
        &self,
        role: Role,
        filter: ReportFilter,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<Vec<PvzWithReceptions>> {
        require(
            role,
            &[Role::Moderator, Role::Employee],
            "read receiving history",
        )?;

        let page = PageRequest::normalize(page, per_page, &self.config);
        self.storage.pvzs_with_receptions(&filter, page).await
    }

    /// Register an account with a pre-hashed credential.
    ///
    /// Hashing and token issuance belong to the external identity
    /// collaborator; the core only persists the account and its role.
    #[tracing::instrument(skip(self, password_hash))]
    pub async fn register_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User> {
        if email.trim().is_empty() {
            return Err(PriemkaError::InvalidInput(
                "email must not be empty".to_string(),
            ));
        }

        let user = self.storage.create_user(email, password_hash, role).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Look up an account by email for the identity collaborator.
    #[tracing::instrument(skip(self))]
    pub async fn user_by_email(&self, email: &str) -> Result<User> {
        self.storage
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| PriemkaError::UserNotFound(email.to_string()))
    }
}

fn require(role: Role, allowed: &[Role], operation: &'static str) -> Result<()> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(PriemkaError::Forbidden { role, operation })
    }
}
