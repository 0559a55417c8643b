//! Table definition model and CREATE TABLE rendering.

use indexmap::IndexMap;

use crate::column::{Column, escape_sql_string};

pub const DEFAULT_ENGINE: &str = "InnoDB";
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

/// A named index: ordered column list plus uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub columns: Vec<String>,
    pub unique: bool,
}

/// The referenced side of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkReference {
    pub table: String,
    pub columns: Vec<String>,
}

/// A foreign-key constraint with its referential actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub references: FkReference,
    pub on_delete: String,
    pub on_update: String,
}

/// One table: columns, primary key, named indexes and foreign keys.
///
/// Built once per load/inspect call and never mutated; all maps preserve
/// declaration order, which the differ's ordering contract relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub comment: Option<String>,
    pub engine: String,
    pub charset: String,
    pub collation: String,
    pub columns: IndexMap<String, Column>,
    pub primary_key: Vec<String>,
    pub indexes: IndexMap<String, IndexDef>,
    pub foreign_keys: IndexMap<String, ForeignKeyDef>,
}

impl TableDefinition {
    /// Create an empty table with the engine/charset/collation defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            engine: DEFAULT_ENGINE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            collation: DEFAULT_COLLATION.to_string(),
            columns: IndexMap::new(),
            primary_key: Vec::new(),
            indexes: IndexMap::new(),
            foreign_keys: IndexMap::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Render the full CREATE TABLE statement.
    ///
    /// Body order is fixed: columns, primary key, one `uk_<col>` unique
    /// key per inline-unique column, named indexes, foreign keys.
    pub fn to_create_sql(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        for column in self.columns.values() {
            lines.push(format!("    {}", column.to_sql()));
        }

        if !self.primary_key.is_empty() {
            lines.push(format!(
                "    PRIMARY KEY (`{}`)",
                self.primary_key.join("`, `")
            ));
        }

        for column in self.columns.values() {
            if column.unique {
                lines.push(format!(
                    "    UNIQUE KEY `uk_{name}` (`{name}`)",
                    name = column.name
                ));
            }
        }

        for (index_name, index) in &self.indexes {
            let key_type = if index.unique { "UNIQUE KEY" } else { "KEY" };
            lines.push(format!(
                "    {} `{}` (`{}`)",
                key_type,
                index_name,
                index.columns.join("`, `")
            ));
        }

        for (fk_name, fk) in &self.foreign_keys {
            lines.push(format!(
                "    CONSTRAINT `{}` FOREIGN KEY (`{}`) REFERENCES `{}` (`{}`) ON DELETE {} ON UPDATE {}",
                fk_name,
                fk.columns.join("`, `"),
                fk.references.table,
                fk.references.columns.join("`, `"),
                fk.on_delete,
                fk.on_update
            ));
        }

        let mut sql = format!("CREATE TABLE `{}` (\n{}\n)", self.name, lines.join(",\n"));
        sql.push_str(&format!(" ENGINE={}", self.engine));
        sql.push_str(&format!(" DEFAULT CHARSET={}", self.charset));
        sql.push_str(&format!(" COLLATE={}", self.collation));

        if let Some(comment) = &self.comment {
            sql.push_str(&format!(" COMMENT='{}'", escape_sql_string(comment)));
        }

        sql.push(';');
        sql
    }
}
