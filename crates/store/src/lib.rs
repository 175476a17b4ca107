//! Store Adapter.
//!
//! Persistence primitives the rest of the engine is built on:
//! transactions, conditional updates ("update if still in state X"),
//! unique-constraint insertion, and the handful of aggregation queries
//! the Tier Controller and Up-Pollination Engine need. Every method
//! here translates PostgreSQL failures into the five error kinds the
//! engine reasons about (spec §7); no `tokio_postgres::Error` ever
//! escapes this crate.
//!
//! ## Core Types
//!
//! - [`Store`] — conditional updates, unique inserts, and transactions
//! - [`StoreError`] — the kinds of failure the rest of the engine sees
//! - [`Schema`] — table metadata and DDL generation for persisted entities
//! - [`db`] — connects to PostgreSQL using the `DB_URL` environment variable
//!
//! ## Table Names
//!
//! Constants for every persisted entity from the data model.
mod connect;
mod error;
mod ops;
mod schema;
mod tables;

pub use connect::db;
pub use connect::owned;
pub use error::StoreError;
pub use ops::Store;
pub use schema::migrate;
pub use schema::Schema;
pub use tables::*;

pub use tokio_postgres::Client;
pub use tokio_postgres::Row;
pub use tokio_postgres::Transaction;
