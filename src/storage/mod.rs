//! Storage trait for persisting pickup points, receptions and products.
//!
//! The relational store is the single source of truth and the sole
//! serialization point: implementations enforce the at-most-one-open
//! reception invariant and the ledger's open-status guard inside single
//! atomic statements, so no application-level double-check is load-bearing.
//!
//! Every operation runs entirely within the caller's future — nothing is
//! detached onto background tasks — so a caller-side deadline (dropping the
//! future) aborts the in-flight store call. Transient store errors surface
//! immediately as [`Unavailable`](crate::PriemkaError::Unavailable); the
//! core never retries.

use async_trait::async_trait;

use crate::domain::product::Product;
use crate::domain::pvz::{Pvz, PvzId, Role};
use crate::domain::reception::{Open, Reception, ReceptionId};
use crate::domain::report::{PageRequest, PvzWithReceptions, ReportFilter};
use crate::domain::user::User;
use crate::error::Result;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// Storage trait for the intake tracking core.
///
/// Lookups that are legitimate branches return `Option` — the caller decides
/// whether an absent row is an error. Methods returning a bare value fail
/// with the corresponding domain error when the row is missing.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a new pickup point, assigning identity and registration time.
    ///
    /// The city has already been validated against the configured
    /// allow-list; the store persists it verbatim.
    async fn create_pvz(&self, city: &str) -> Result<Pvz>;

    /// One page of pickup points, descending by registration time.
    async fn list_pvzs(&self, page: PageRequest) -> Result<Vec<Pvz>>;

    /// Open a new reception for the pickup point.
    ///
    /// The no-open-reception check and the insert are one atomic unit,
    /// backed by the store's partial uniqueness guard. Fails with
    /// [`OpenReceptionExists`](crate::PriemkaError::OpenReceptionExists) if
    /// an open reception already exists, and with
    /// [`PvzNotFound`](crate::PriemkaError::PvzNotFound) for an unknown
    /// pickup point.
    async fn create_reception(&self, pvz_id: PvzId) -> Result<Reception<Open>>;

    /// The unique open reception for a pickup point, if any.
    ///
    /// `None` is a legitimate branch ("safe to create one"), distinct from
    /// the user-visible failure the service layer derives from it.
    async fn find_open_reception(&self, pvz_id: PvzId) -> Result<Option<Reception<Open>>>;

    /// Flip a reception's status to closed, only if it is still open.
    ///
    /// Fails with [`ReceptionClosed`](crate::PriemkaError::ReceptionClosed)
    /// when the row is already closed or absent — losing a double-close
    /// race is reported, never papered over. Called through
    /// [`Reception::close`], which is the only path handing out a
    /// `Reception<Closed>`.
    async fn close_reception(&self, reception_id: ReceptionId) -> Result<()>;

    /// Append a product to a reception's ledger.
    ///
    /// The reception-is-open check runs inside the same statement as the
    /// insert, closing the race between "reception just closed" and
    /// "product still being added". Fails with
    /// [`ReceptionClosed`](crate::PriemkaError::ReceptionClosed) otherwise.
    async fn add_product(&self, reception_id: ReceptionId, product_type: &str) -> Result<Product>;

    /// The most recently added product of a reception, if any.
    ///
    /// Latest `created_at` wins; insertion order breaks ties.
    async fn get_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>>;

    /// Atomically remove and return the most recently added product.
    ///
    /// This is the only deletion the ledger exposes — LIFO discipline is
    /// enforced here, not by caller convention. Only acts on an open
    /// reception (a closed ledger is frozen); returns `None` when the
    /// reception has no products left.
    async fn delete_last_product(&self, reception_id: ReceptionId) -> Result<Option<Product>>;

    /// One page of pickup points with their receiving history.
    ///
    /// Page of PVZs descending by registration time; per PVZ, receptions
    /// with `created_at` in the filter's inclusive range, descending; per
    /// reception, all products descending. An absent filter end resolves to
    /// "now" at query time.
    async fn pvzs_with_receptions(
        &self,
        filter: &ReportFilter,
        page: PageRequest,
    ) -> Result<Vec<PvzWithReceptions>>;

    /// Register an account. Fails with
    /// [`UserExists`](crate::PriemkaError::UserExists) on a duplicate email.
    async fn create_user(&self, email: &str, password_hash: &str, role: Role) -> Result<User>;

    /// Look up an account by email. `None` is a legitimate branch.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
