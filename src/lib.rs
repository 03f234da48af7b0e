//! Intake tracking for pickup points (PVZ).
//!
//! This crate is the reception/inventory lifecycle core: pickup point
//! registration against a configured city allow-list, the open→closed
//! reception state machine, the LIFO product ledger, and the paginated,
//! date-filtered aggregation reconstructing a pickup point's receiving
//! history. Transport, authentication and process bootstrap live outside;
//! callers hand in a pre-authenticated role per operation.
//!
//! Durable state lives in PostgreSQL behind the [`storage::Storage`] trait;
//! an in-memory implementation backs tests and embedded use.

pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use domain::product::{Product, ProductId};
pub use domain::pvz::{Pvz, PvzId, Role};
pub use domain::reception::{
    AnyReception, Closed, Open, Reception, ReceptionData, ReceptionId, ReceptionStatus,
};
pub use domain::report::{PageRequest, PvzWithReceptions, ReceptionWithProducts, ReportFilter};
pub use domain::user::{User, UserId};
pub use error::{ErrorKind, PriemkaError, Result};
pub use service::PvzService;
pub use storage::memory::InMemoryStorage;
#[cfg(feature = "postgres")]
pub use storage::postgres::PostgresStorage;
pub use storage::Storage;

/// Get the priemka database migrator
///
/// Returns a migrator that can be run against a connection pool.
#[cfg(feature = "postgres")]
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}
