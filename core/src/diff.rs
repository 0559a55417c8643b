//! Schema comparison.
//!
//! The differ reads two [`TableDefinition`]s (or a definition and an
//! absent live table) and produces an ordered list of [`DiffOp`]s.
//! Ordering is part of the contract: ops follow table declaration order,
//! then column/index/foreign-key declaration order, so two runs over an
//! unchanged schema emit byte-identical SQL.

use indexmap::IndexMap;

use crate::column::Column;
use crate::table::{ForeignKeyDef, IndexDef, TableDefinition};

/// One atomic, directly renderable schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    CreateTable {
        table: String,
        definition: TableDefinition,
    },
    DropTable {
        table: String,
    },
    AddColumn {
        table: String,
        column: Column,
    },
    ModifyColumn {
        table: String,
        column: Column,
        /// The live column being replaced, kept for reporting.
        from: Column,
    },
    DropColumn {
        table: String,
        column: String,
    },
    AddIndex {
        table: String,
        name: String,
        index: IndexDef,
    },
    DropIndex {
        table: String,
        name: String,
    },
    AddForeignKey {
        table: String,
        name: String,
        foreign_key: ForeignKeyDef,
    },
    DropForeignKey {
        table: String,
        name: String,
    },
}

impl DiffOp {
    /// The table this operation belongs to.
    pub fn table(&self) -> &str {
        match self {
            DiffOp::CreateTable { table, .. }
            | DiffOp::DropTable { table }
            | DiffOp::AddColumn { table, .. }
            | DiffOp::ModifyColumn { table, .. }
            | DiffOp::DropColumn { table, .. }
            | DiffOp::AddIndex { table, .. }
            | DiffOp::DropIndex { table, .. }
            | DiffOp::AddForeignKey { table, .. }
            | DiffOp::DropForeignKey { table, .. } => table,
        }
    }

    /// Human label used in migration file headers.
    pub fn label(&self) -> &'static str {
        match self {
            DiffOp::CreateTable { .. } => "create table",
            DiffOp::DropTable { .. } => "drop table",
            DiffOp::AddColumn { .. } => "add column",
            DiffOp::ModifyColumn { .. } => "modify column",
            DiffOp::DropColumn { .. } => "drop column",
            DiffOp::AddIndex { .. } => "add index",
            DiffOp::DropIndex { .. } => "drop index",
            DiffOp::AddForeignKey { .. } => "add foreign key",
            DiffOp::DropForeignKey { .. } => "drop foreign key",
        }
    }
}

/// Compares desired definitions against inspected live tables.
#[derive(Debug, Default)]
pub struct SchemaDiffer;

impl SchemaDiffer {
    pub fn new() -> Self {
        Self
    }

    /// Diff one desired table against its (possibly absent) live
    /// counterpart. An absent live table yields a single create-table op
    /// carrying the full definition.
    pub fn diff(&self, desired: &TableDefinition, actual: Option<&TableDefinition>) -> Vec<DiffOp> {
        let Some(actual) = actual else {
            return vec![DiffOp::CreateTable {
                table: desired.name.clone(),
                definition: desired.clone(),
            }];
        };

        let mut diffs = Vec::new();
        diffs.extend(self.diff_columns(desired, actual));
        diffs.extend(self.diff_indexes(desired, actual));
        diffs.extend(self.diff_foreign_keys(desired, actual));
        diffs
    }

    /// Diff a whole collection pair. With `drop_unknown` set, live
    /// tables that have no desired counterpart get a drop-table op,
    /// after all desired-table diffs.
    pub fn diff_all(
        &self,
        desired: &IndexMap<String, TableDefinition>,
        actual: &IndexMap<String, TableDefinition>,
        drop_unknown: bool,
    ) -> Vec<DiffOp> {
        let mut diffs = Vec::new();

        for (table_name, desired_table) in desired {
            diffs.extend(self.diff(desired_table, actual.get(table_name)));
        }

        if drop_unknown {
            for table_name in actual.keys() {
                if !desired.contains_key(table_name) {
                    diffs.push(DiffOp::DropTable {
                        table: table_name.clone(),
                    });
                }
            }
        }

        diffs
    }

    fn diff_columns(&self, desired: &TableDefinition, actual: &TableDefinition) -> Vec<DiffOp> {
        let mut diffs = Vec::new();
        let table = &desired.name;

        for (column_name, desired_column) in &desired.columns {
            match actual.columns.get(column_name) {
                None => diffs.push(DiffOp::AddColumn {
                    table: table.clone(),
                    column: desired_column.clone(),
                }),
                Some(actual_column) if !desired_column.equals(actual_column) => {
                    diffs.push(DiffOp::ModifyColumn {
                        table: table.clone(),
                        column: desired_column.clone(),
                        from: actual_column.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        for column_name in actual.columns.keys() {
            if !desired.columns.contains_key(column_name) {
                diffs.push(DiffOp::DropColumn {
                    table: table.clone(),
                    column: column_name.clone(),
                });
            }
        }

        diffs
    }

    fn diff_indexes(&self, desired: &TableDefinition, actual: &TableDefinition) -> Vec<DiffOp> {
        let mut diffs = Vec::new();
        let table = &desired.name;

        for (index_name, desired_index) in &desired.indexes {
            match actual.indexes.get(index_name) {
                None => diffs.push(DiffOp::AddIndex {
                    table: table.clone(),
                    name: index_name.clone(),
                    index: desired_index.clone(),
                }),
                Some(actual_index) if actual_index != desired_index => {
                    // Indexes cannot be altered in place; drop first so
                    // the recreate never collides with the old name.
                    diffs.push(DiffOp::DropIndex {
                        table: table.clone(),
                        name: index_name.clone(),
                    });
                    diffs.push(DiffOp::AddIndex {
                        table: table.clone(),
                        name: index_name.clone(),
                        index: desired_index.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        for index_name in actual.indexes.keys() {
            if !desired.indexes.contains_key(index_name) {
                diffs.push(DiffOp::DropIndex {
                    table: table.clone(),
                    name: index_name.clone(),
                });
            }
        }

        diffs
    }

    fn diff_foreign_keys(&self, desired: &TableDefinition, actual: &TableDefinition) -> Vec<DiffOp> {
        let mut diffs = Vec::new();
        let table = &desired.name;

        for (fk_name, desired_fk) in &desired.foreign_keys {
            match actual.foreign_keys.get(fk_name) {
                None => diffs.push(DiffOp::AddForeignKey {
                    table: table.clone(),
                    name: fk_name.clone(),
                    foreign_key: desired_fk.clone(),
                }),
                Some(actual_fk) if actual_fk != desired_fk => {
                    diffs.push(DiffOp::DropForeignKey {
                        table: table.clone(),
                        name: fk_name.clone(),
                    });
                    diffs.push(DiffOp::AddForeignKey {
                        table: table.clone(),
                        name: fk_name.clone(),
                        foreign_key: desired_fk.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        for fk_name in actual.foreign_keys.keys() {
            if !desired.foreign_keys.contains_key(fk_name) {
                diffs.push(DiffOp::DropForeignKey {
                    table: table.clone(),
                    name: fk_name.clone(),
                });
            }
        }

        diffs
    }
}
