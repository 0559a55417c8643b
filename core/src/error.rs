//! Error types for the migration engine.

use std::path::PathBuf;

/// Errors surfaced by loading, introspection and generation.
///
/// Input errors abort the current step without partial results; a table
/// that does not exist in the live database is *not* an error (the
/// inspector returns `Ok(None)` and the differ emits a create-table op).
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A table definition file or directory does not exist.
    #[error("definition not found: {0}")]
    DefinitionNotFound(PathBuf),

    /// A table definition file could not be parsed.
    #[error("invalid table definition {path}: {message}")]
    InvalidDefinition { path: PathBuf, message: String },

    /// A table definition document is missing its required `name` field.
    #[error("table definition {0} has no table name")]
    MissingTableName(PathBuf),

    /// A column uses `format` but the loader was built without a rules
    /// directory.
    #[error(
        "column format \"{format}\" cannot be resolved: no rules directory configured \
         (pass --rules or set rules_dir in the config file)"
    )]
    RulesUnavailable { format: String },

    /// The configured rules directory does not exist.
    #[error("rules directory not found: {0}")]
    RulesDirNotFound(PathBuf),

    /// A referenced rule file does not exist.
    #[error("rule file not found: {0}")]
    RuleNotFound(PathBuf),

    /// A rule file could not be parsed.
    #[error("invalid rule file {path}: {message}")]
    InvalidRule { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, MigrateError>;
