//! DDL rendering.
//!
//! Every [`DiffOp`] maps to exactly one SQL statement, preceded by a
//! descriptive comment line; statements are separated by blank lines.

use crate::diff::DiffOp;

/// Renders diff operations into executable MySQL DDL.
#[derive(Debug, Default)]
pub struct DdlGenerator;

impl DdlGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render the whole change set. An empty diff list renders the
    /// empty string.
    pub fn generate(&self, diffs: &[DiffOp]) -> String {
        diffs
            .iter()
            .map(|diff| self.statement(diff))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn statement(&self, diff: &DiffOp) -> String {
        match diff {
            DiffOp::CreateTable { table, definition } => {
                format!("-- Table: {table} (create)\n{}", definition.to_create_sql())
            }
            DiffOp::DropTable { table } => {
                format!("-- Table: {table} (drop)\nDROP TABLE IF EXISTS `{table}`;")
            }
            DiffOp::AddColumn { table, column } => {
                let mut sql = format!("ALTER TABLE `{table}` ADD COLUMN {}", column.to_sql());
                if let Some(after) = &column.after {
                    sql.push_str(&format!(" AFTER `{after}`"));
                }
                format!("-- Table: {table} - add column: {}\n{sql};", column.name)
            }
            DiffOp::ModifyColumn { table, column, .. } => {
                format!(
                    "-- Table: {table} - modify column: {}\nALTER TABLE `{table}` MODIFY COLUMN {};",
                    column.name,
                    column.to_sql()
                )
            }
            DiffOp::DropColumn { table, column } => {
                format!(
                    "-- Table: {table} - drop column: {column}\nALTER TABLE `{table}` DROP COLUMN `{column}`;"
                )
            }
            DiffOp::AddIndex { table, name, index } => {
                let key_type = if index.unique { "UNIQUE INDEX" } else { "INDEX" };
                format!(
                    "-- Table: {table} - add index: {name}\nCREATE {key_type} `{name}` ON `{table}` (`{}`);",
                    index.columns.join("`, `")
                )
            }
            DiffOp::DropIndex { table, name } => {
                format!(
                    "-- Table: {table} - drop index: {name}\nDROP INDEX `{name}` ON `{table}`;"
                )
            }
            DiffOp::AddForeignKey {
                table,
                name,
                foreign_key,
            } => {
                format!(
                    "-- Table: {table} - add foreign key: {name}\n\
                     ALTER TABLE `{table}` ADD CONSTRAINT `{name}` \
                     FOREIGN KEY (`{}`) REFERENCES `{}` (`{}`) \
                     ON DELETE {} ON UPDATE {};",
                    foreign_key.columns.join("`, `"),
                    foreign_key.references.table,
                    foreign_key.references.columns.join("`, `"),
                    foreign_key.on_delete,
                    foreign_key.on_update
                )
            }
            DiffOp::DropForeignKey { table, name } => {
                format!(
                    "-- Table: {table} - drop foreign key: {name}\nALTER TABLE `{table}` DROP FOREIGN KEY `{name}`;"
                )
            }
        }
    }
}
