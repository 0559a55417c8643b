//! drift-core - declarative schema migration engine for MySQL.
//!
//! Table structure is declared in JSON documents, the live database is
//! introspected through `information_schema`, and the difference between
//! the two is emitted as DDL. The engine never executes the SQL it
//! generates and keeps no migration history: every run is a stateless,
//! idempotent comparison against current live state.
//!
//! Pipeline, leaves first:
//!
//! - [`column`] / [`table`]: immutable value models shared by the
//!   declared and inspected sides of every comparison
//! - [`loader`] / [`rules`]: JSON definition documents, with shared
//!   column shapes resolved by reference
//! - [`inspect`]: live-catalog introspection and normalization
//! - [`diff`]: ordered, deterministic schema comparison
//! - [`ddl`]: one SQL statement per diff operation
//! - [`manager`]: the load -> inspect -> diff -> generate orchestration

pub mod column;
pub mod ddl;
pub mod diff;
pub mod error;
pub mod inspect;
pub mod loader;
pub mod manager;
pub mod rules;
pub mod table;

pub use column::{Column, DefaultValue};
pub use ddl::DdlGenerator;
pub use diff::{DiffOp, SchemaDiffer};
pub use error::{MigrateError, Result};
pub use inspect::DatabaseInspector;
pub use loader::TableDefinitionLoader;
pub use manager::{MigrationManager, Preview};
pub use rules::RuleToColumnConverter;
pub use table::{FkReference, ForeignKeyDef, IndexDef, TableDefinition};
