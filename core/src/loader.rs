//! Table definition documents and their loader.
//!
//! One JSON document describes one table. Loading is a two-stage
//! pipeline: first every `format` reference is resolved
//! into a concrete column shape (failing fast when resolution is needed
//! but no rules directory was configured), then the immutable
//! [`TableDefinition`] is constructed.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::column::{Column, DefaultValue};
use crate::error::{MigrateError, Result};
use crate::rules::RuleToColumnConverter;
use crate::table::{FkReference, ForeignKeyDef, IndexDef, TableDefinition};

/// A column shape as written in a definition document. Every field is
/// optional so the same struct doubles as the override set merged onto a
/// resolved `format` shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDoc {
    /// Shared-shape reference, resolved through the rules directory.
    pub format: Option<String>,
    #[serde(rename = "type")]
    pub sql_type: Option<String>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: Option<bool>,
    pub nullable: Option<bool>,
    pub auto_increment: Option<bool>,
    /// Present-vs-absent matters: `"default": null` is an explicit NULL
    /// default, a missing key is no default at all.
    #[serde(default, deserialize_with = "explicit_default")]
    pub default: Option<DefaultValue>,
    pub comment: Option<String>,
    pub on_update: Option<String>,
    pub values: Option<Vec<String>>,
    pub unique: Option<bool>,
    pub after: Option<String>,
}

impl ColumnDoc {
    /// Overlay `overrides` on top of `self`; any attribute the table
    /// side declares wins over the resolved shape.
    pub fn merged_with(&self, overrides: &ColumnDoc) -> ColumnDoc {
        ColumnDoc {
            format: None,
            sql_type: overrides.sql_type.clone().or_else(|| self.sql_type.clone()),
            length: overrides.length.or(self.length),
            precision: overrides.precision.or(self.precision),
            scale: overrides.scale.or(self.scale),
            unsigned: overrides.unsigned.or(self.unsigned),
            nullable: overrides.nullable.or(self.nullable),
            auto_increment: overrides.auto_increment.or(self.auto_increment),
            default: overrides.default.clone().or_else(|| self.default.clone()),
            comment: overrides.comment.clone().or_else(|| self.comment.clone()),
            on_update: overrides.on_update.clone().or_else(|| self.on_update.clone()),
            values: overrides.values.clone().or_else(|| self.values.clone()),
            unique: overrides.unique.or(self.unique),
            after: overrides.after.clone().or_else(|| self.after.clone()),
        }
    }
}

/// Keep JSON `null` distinguishable from an absent `default` key.
fn explicit_default<'de, D>(deserializer: D) -> std::result::Result<Option<DefaultValue>, D::Error>
where
    D: Deserializer<'de>,
{
    DefaultValue::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexDoc {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FkReferenceDoc {
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDoc {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub references: FkReferenceDoc,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

/// A whole table document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDoc {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    #[serde(default)]
    pub columns: IndexMap<String, ColumnDoc>,
    /// A single column name or a list.
    #[serde(default, deserialize_with = "string_or_seq")]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub indexes: IndexMap<String, IndexDoc>,
    #[serde(default)]
    pub foreign_keys: IndexMap<String, ForeignKeyDoc>,
}

fn string_or_seq<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Construct a [`Column`] from a fully resolved document shape,
/// applying the same normalization on both the declared and the
/// inspected side (lower-cased type, upper-cased ON UPDATE keyword,
/// canonicalized keyword defaults).
pub(crate) fn column_from_doc(name: &str, doc: &ColumnDoc) -> Column {
    let mut column = Column::new(name, doc.sql_type.as_deref().unwrap_or("varchar"));
    column.length = doc.length;
    column.precision = doc.precision;
    column.scale = doc.scale;
    column.unsigned = doc.unsigned.unwrap_or(false);
    column.nullable = doc.nullable.unwrap_or(false);
    column.auto_increment = doc.auto_increment.unwrap_or(false);
    column.default = doc.default.clone().map(DefaultValue::normalized);
    column.comment = doc.comment.clone();
    column.on_update = doc.on_update.as_ref().map(|s| s.to_uppercase());
    column.enum_values = doc.values.clone().unwrap_or_default();
    column.unique = doc.unique.unwrap_or(false);
    column.after = doc.after.clone();
    column
}

/// Construct a [`TableDefinition`] from a document whose `format`
/// references have already been resolved.
pub(crate) fn definition_from_doc(name: String, doc: &TableDoc) -> TableDefinition {
    let mut table = TableDefinition::new(name);
    table.comment = doc.comment.clone();
    if let Some(engine) = &doc.engine {
        table.engine = engine.clone();
    }
    if let Some(charset) = &doc.charset {
        table.charset = charset.clone();
    }
    if let Some(collation) = &doc.collation {
        table.collation = collation.clone();
    }

    for (column_name, column_doc) in &doc.columns {
        table
            .columns
            .insert(column_name.clone(), column_from_doc(column_name, column_doc));
    }

    table.primary_key = doc.primary_key.clone();

    for (index_name, index_doc) in &doc.indexes {
        table.indexes.insert(
            index_name.clone(),
            IndexDef {
                columns: index_doc.columns.clone(),
                unique: index_doc.unique,
            },
        );
    }

    for (fk_name, fk_doc) in &doc.foreign_keys {
        table.foreign_keys.insert(
            fk_name.clone(),
            ForeignKeyDef {
                columns: fk_doc.columns.clone(),
                references: FkReference {
                    table: fk_doc.references.table.clone(),
                    columns: fk_doc.references.columns.clone(),
                },
                on_delete: fk_doc.on_delete.clone().unwrap_or_else(|| "RESTRICT".into()),
                on_update: fk_doc.on_update.clone().unwrap_or_else(|| "RESTRICT".into()),
            },
        );
    }

    table
}

/// Loads table definition documents from disk.
pub struct TableDefinitionLoader {
    converter: Option<RuleToColumnConverter>,
}

impl TableDefinitionLoader {
    /// The converter is an explicit dependency: pass `None` and any
    /// document using `format` fails with a descriptive error instead of
    /// silently producing a half-resolved table.
    pub fn new(converter: Option<RuleToColumnConverter>) -> Self {
        Self { converter }
    }

    /// Load one table definition from a JSON file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<TableDefinition> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MigrateError::DefinitionNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let mut doc: TableDoc =
            serde_json::from_str(&content).map_err(|e| MigrateError::InvalidDefinition {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let name = doc
            .name
            .take()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MigrateError::MissingTableName(path.to_path_buf()))?;

        self.resolve_formats(&mut doc)?;
        Ok(definition_from_doc(name, &doc))
    }

    /// Load every `*.json` file in a directory, keyed by declared table
    /// name, in sorted filename order. An existing-but-empty directory
    /// yields an empty map; a malformed file fails the whole load.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<IndexMap<String, TableDefinition>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(MigrateError::DefinitionNotFound(dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut tables = IndexMap::new();
        for file in files {
            let table = self.load(&file)?;
            tables.insert(table.name.clone(), table);
        }
        Ok(tables)
    }

    /// Stage one of the pipeline: replace every `format` reference with
    /// the concrete shape it resolves to.
    fn resolve_formats(&self, doc: &mut TableDoc) -> Result<()> {
        for column_doc in doc.columns.values_mut() {
            let Some(format) = column_doc.format.take() else {
                continue;
            };

            let Some(converter) = &self.converter else {
                return Err(MigrateError::RulesUnavailable { format });
            };

            *column_doc = converter.convert(&format, column_doc)?;
        }
        Ok(())
    }
}
