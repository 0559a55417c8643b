//! Migration orchestration.
//!
//! Wires the pipeline together: load declared definitions, inspect the
//! live tables they name, diff, render DDL. `preview` never touches the
//! filesystem; `generate_migration` writes a timestamped SQL file or
//! reports that there is nothing to do. Every invocation re-reads the
//! live catalog in full - nothing is cached between runs.

use std::path::{Path, PathBuf};

use chrono::Local;
use indexmap::IndexMap;
use sqlx::mysql::MySqlPool;

use crate::ddl::DdlGenerator;
use crate::diff::{DiffOp, SchemaDiffer};
use crate::error::Result;
use crate::inspect::DatabaseInspector;
use crate::loader::TableDefinitionLoader;
use crate::rules::RuleToColumnConverter;
use crate::table::TableDefinition;

/// Result of a dry run: the diff ops and the SQL they render to.
#[derive(Debug)]
pub struct Preview {
    pub diffs: Vec<DiffOp>,
    pub sql: String,
}

/// Drives one load -> inspect -> diff -> generate run.
pub struct MigrationManager {
    inspector: DatabaseInspector,
    loader: TableDefinitionLoader,
    differ: SchemaDiffer,
    generator: DdlGenerator,
    definitions_dir: PathBuf,
    output_dir: PathBuf,
}

impl MigrationManager {
    /// All collaborators are built from explicit arguments; the rules
    /// directory is optional and only required when definitions use
    /// `format` references.
    pub async fn new(
        pool: MySqlPool,
        definitions_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        rules_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let converter = rules_dir.map(RuleToColumnConverter::new).transpose()?;
        Ok(Self {
            inspector: DatabaseInspector::new(pool, None).await?,
            loader: TableDefinitionLoader::new(converter),
            differ: SchemaDiffer::new(),
            generator: DdlGenerator::new(),
            definitions_dir: definitions_dir.into(),
            output_dir: output_dir.into(),
        })
    }

    /// Compute the pending change set without writing anything.
    pub async fn preview(&self, drop_unknown: bool) -> Result<Preview> {
        let diffs = self.compute_diffs(drop_unknown).await?;
        let sql = if diffs.is_empty() {
            String::new()
        } else {
            self.build_migration_sql(&diffs)
        };
        Ok(Preview { diffs, sql })
    }

    /// Write the pending change set to a timestamped SQL file. Returns
    /// `None` when there are no changes; never writes a partial file.
    pub async fn generate_migration(&self, drop_unknown: bool) -> Result<Option<PathBuf>> {
        let diffs = self.compute_diffs(drop_unknown).await?;
        if diffs.is_empty() {
            return Ok(None);
        }
        let sql = self.build_migration_sql(&diffs);
        Ok(Some(write_migration_file(&self.output_dir, &sql)?))
    }

    async fn compute_diffs(&self, drop_unknown: bool) -> Result<Vec<DiffOp>> {
        let desired = self.loader.load_dir(&self.definitions_dir)?;
        if desired.is_empty() {
            return Ok(Vec::new());
        }

        let mut actual: IndexMap<String, TableDefinition> = IndexMap::new();
        for table_name in desired.keys() {
            if let Some(table) = self.inspector.table_definition(table_name).await? {
                actual.insert(table_name.clone(), table);
            }
        }

        // Dropping unknown tables needs the live tables the definitions
        // never mention.
        if drop_unknown {
            for table_name in self.inspector.list_tables().await? {
                if desired.contains_key(&table_name) {
                    continue;
                }
                if let Some(table) = self.inspector.table_definition(&table_name).await? {
                    actual.insert(table_name, table);
                }
            }
        }

        Ok(self.differ.diff_all(&desired, &actual, drop_unknown))
    }

    fn build_migration_sql(&self, diffs: &[DiffOp]) -> String {
        format!(
            "{}\n\n{}\n",
            build_header(diffs),
            self.generator.generate(diffs)
        )
    }
}

/// Header comment block: generation timestamp plus one summary line per
/// distinct (operation, table) pair, in diff order.
fn build_header(diffs: &[DiffOp]) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

    let mut header = String::new();
    header.push_str("-- ============================================\n");
    header.push_str(&format!("-- Migration generated at {timestamp}\n"));
    header.push_str("-- drift declarative migration\n");
    header.push_str("-- ============================================\n");
    header.push_str("--\n");
    header.push_str("-- Summary:\n");

    for line in summarize_diffs(diffs) {
        header.push_str(&format!("-- {line}\n"));
    }

    // Drop the trailing newline so callers control the separator.
    header.pop();
    header
}

/// One `<table>: <label>` line per distinct (operation, table) pair.
fn summarize_diffs(diffs: &[DiffOp]) -> Vec<String> {
    let mut seen: IndexMap<(String, &'static str), ()> = IndexMap::new();
    for diff in diffs {
        seen.entry((diff.table().to_string(), diff.label()))
            .or_insert(());
    }
    seen.keys()
        .map(|(table, label)| format!("{table}: {label}"))
        .collect()
}

/// Write the SQL to `<output_dir>/<timestamp>_migration.sql`, creating
/// the directory if needed.
fn write_migration_file(output_dir: &Path, sql: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let filename = format!("{}_migration.sql", Local::now().format("%Y%m%d_%H%M%S"));
    let filepath = output_dir.join(filename);
    std::fs::write(&filepath, sql)?;
    Ok(filepath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_diffs() -> Vec<DiffOp> {
        let mut table = TableDefinition::new("users");
        table.columns.insert("id".into(), Column::new("id", "int"));
        vec![
            DiffOp::CreateTable {
                table: "users".into(),
                definition: table,
            },
            DiffOp::AddColumn {
                table: "posts".into(),
                column: Column::new("title", "varchar"),
            },
            DiffOp::AddColumn {
                table: "posts".into(),
                column: Column::new("body", "text"),
            },
            DiffOp::DropIndex {
                table: "posts".into(),
                name: "idx_old".into(),
            },
        ]
    }

    #[test]
    fn test_summary_dedupes_per_table_and_kind() {
        assert_eq!(
            summarize_diffs(&sample_diffs()),
            vec![
                "users: create table".to_string(),
                "posts: add column".to_string(),
                "posts: drop index".to_string(),
            ]
        );
    }

    #[test]
    fn test_header_shape() {
        let header = build_header(&sample_diffs());
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines[0], "-- ============================================");
        assert!(lines[1].starts_with("-- Migration generated at "));
        assert_eq!(lines[5], "-- Summary:");
        assert_eq!(lines[6], "-- users: create table");
        assert!(lines.iter().all(|line| line.starts_with("--")));
    }

    #[test]
    fn test_write_migration_file_creates_dir_and_suffix() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("migrations");

        let path = write_migration_file(&output, "-- test\n").unwrap();
        assert!(path.starts_with(&output));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with("_migration.sql")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "-- test\n");
    }
}
