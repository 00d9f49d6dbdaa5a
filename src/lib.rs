//! File-backed SQLite user records.
//!
//! # Intention
//!
//! - Describe tables with explicit schema objects instead of binding business
//!   types to the store.
//! - Map plain data records to rows through the [`Record`] trait.
//! - Run all reads and writes through a scoped [`Session`] that commits
//!   explicitly and rolls back whatever it did not commit.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here.
//! - One store handle, one session at a time; no pooling, migrations or
//!   relationships between tables.

pub mod demo;
pub mod error;
pub mod query;
pub mod schema;
pub mod sqlite;
pub mod user;

pub use error::{Error, Result};
pub use query::{Query, QueryOperator, Value};
pub use schema::{ColumnConstraint, ColumnDefinition, DataType, Schema, TableDefinition};
pub use sqlite::{Record, Session, SqliteConfig, SqliteStore};
pub use user::{users_table, User};
