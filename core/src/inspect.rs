//! Live schema introspection.
//!
//! Rebuilds [`TableDefinition`]s from `information_schema` so the differ
//! can compare them against declared definitions. The comparison is only
//! meaningful if both sides converge to the same canonical form for
//! equivalent schemas, so everything the server reports goes through the
//! normalization rules in this module:
//!
//! - type names are lower-cased and folded through a fixed alias table,
//!   with `tinyint(1)` reported as `boolean` to match the declared side;
//! - a reported default of the literal string `NULL` is an implicit
//!   default, not a declared one, and is dropped;
//! - timestamp-generation keywords collapse to `CURRENT_TIMESTAMP`;
//! - numeric defaults reported as strings are cast to the column type,
//!   and boolean columns get boolean literals for both `0` and `1`;
//! - quoted string defaults lose their surrounding quotes;
//! - a single-column unique index named `uk_<column>` is folded into the
//!   column's own `unique` attribute and removed from the index set;
//! - indexes backing a foreign-key constraint are excluded.
//!
//! Row parsing is pure and fully unit-tested; the async methods are thin
//! wrappers around catalog queries.

use std::collections::HashSet;

use indexmap::IndexMap;
use sqlx::mysql::MySqlPool;
use sqlx::Row;

use crate::column::DefaultValue;
use crate::error::Result;
use crate::loader::{ColumnDoc, column_from_doc};
use crate::table::{FkReference, ForeignKeyDef, IndexDef, TableDefinition};

/// Reads the live schema through a read-only connection.
///
/// The pool and schema name are explicit dependencies; the inspector
/// never reaches into ambient connection state.
pub struct DatabaseInspector {
    pool: MySqlPool,
    database: String,
}

impl DatabaseInspector {
    /// Bind to a pool and schema. With `database: None` the currently
    /// selected schema of the connection is used.
    pub async fn new(pool: MySqlPool, database: Option<String>) -> Result<Self> {
        let database = match database {
            Some(db) => db,
            None => {
                let row = sqlx::query("SELECT DATABASE()").fetch_one(&pool).await?;
                row.try_get::<Option<String>, _>(0)?.unwrap_or_default()
            }
        };
        Ok(Self { pool, database })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Names of all base tables in the schema.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES
             WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'",
        )
        .bind(&self.database)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("TABLE_NAME"))
            .collect())
    }

    /// Reconstruct one table, or `None` if it does not exist.
    pub async fn table_definition(&self, table_name: &str) -> Result<Option<TableDefinition>> {
        let Some(info) = self.table_info(table_name).await? else {
            return Ok(None);
        };

        let raw_columns = self.fetch_columns(table_name).await?;
        let primary_key = self.fetch_primary_key(table_name).await?;
        let foreign_keys = self.fetch_foreign_keys(table_name).await?;
        let index_rows = self.fetch_index_rows(table_name).await?;

        let fk_names: HashSet<String> = foreign_keys.keys().cloned().collect();
        let indexes = group_index_rows(index_rows, &fk_names);

        Ok(Some(assemble_definition(
            table_name,
            info,
            raw_columns,
            primary_key,
            indexes,
            foreign_keys,
        )))
    }

    async fn table_info(&self, table_name: &str) -> Result<Option<RawTableInfo>> {
        let row = sqlx::query(
            "SELECT ENGINE, TABLE_COLLATION, TABLE_COMMENT
             FROM INFORMATION_SCHEMA.TABLES
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
        )
        .bind(&self.database)
        .bind(table_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| RawTableInfo {
            engine: row.get::<Option<String>, _>("ENGINE"),
            collation: row.get::<Option<String>, _>("TABLE_COLLATION"),
            comment: row.get::<Option<String>, _>("TABLE_COMMENT"),
        }))
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<RawColumn>> {
        let rows = sqlx::query(
            "SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, IS_NULLABLE,
                    COLUMN_DEFAULT, EXTRA, COLUMN_COMMENT, CHARACTER_MAXIMUM_LENGTH,
                    NUMERIC_PRECISION, NUMERIC_SCALE
             FROM INFORMATION_SCHEMA.COLUMNS
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
             ORDER BY ORDINAL_POSITION",
        )
        .bind(&self.database)
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RawColumn {
                name: row.get("COLUMN_NAME"),
                data_type: row.get("DATA_TYPE"),
                column_type: row.get("COLUMN_TYPE"),
                is_nullable: row.get("IS_NULLABLE"),
                column_default: row.get("COLUMN_DEFAULT"),
                extra: row.get("EXTRA"),
                comment: row.get("COLUMN_COMMENT"),
                char_max_length: row.get("CHARACTER_MAXIMUM_LENGTH"),
                numeric_precision: row.get("NUMERIC_PRECISION"),
                numeric_scale: row.get("NUMERIC_SCALE"),
            })
            .collect())
    }

    async fn fetch_primary_key(&self, table_name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT COLUMN_NAME
             FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
             ORDER BY ORDINAL_POSITION",
        )
        .bind(&self.database)
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("COLUMN_NAME"))
            .collect())
    }

    async fn fetch_index_rows(&self, table_name: &str) -> Result<Vec<RawIndexRow>> {
        let rows = sqlx::query(
            "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE
             FROM INFORMATION_SCHEMA.STATISTICS
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME != 'PRIMARY'
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
        )
        .bind(&self.database)
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RawIndexRow {
                index_name: row.get("INDEX_NAME"),
                column_name: row.get("COLUMN_NAME"),
                non_unique: row.get::<i64, _>("NON_UNIQUE"),
            })
            .collect())
    }

    async fn fetch_foreign_keys(&self, table_name: &str) -> Result<IndexMap<String, ForeignKeyDef>> {
        let rows = sqlx::query(
            "SELECT kcu.CONSTRAINT_NAME, kcu.COLUMN_NAME,
                    kcu.REFERENCED_TABLE_NAME, kcu.REFERENCED_COLUMN_NAME,
                    rc.DELETE_RULE, rc.UPDATE_RULE
             FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
             JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
                ON kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
                AND kcu.TABLE_SCHEMA = rc.CONSTRAINT_SCHEMA
             WHERE kcu.TABLE_SCHEMA = ? AND kcu.TABLE_NAME = ?
                AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
             ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION",
        )
        .bind(&self.database)
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        let mut foreign_keys: IndexMap<String, ForeignKeyDef> = IndexMap::new();
        for row in &rows {
            let fk_name: String = row.get("CONSTRAINT_NAME");
            let fk = foreign_keys.entry(fk_name).or_insert_with(|| ForeignKeyDef {
                columns: Vec::new(),
                references: FkReference {
                    table: row.get("REFERENCED_TABLE_NAME"),
                    columns: Vec::new(),
                },
                on_delete: row.get("DELETE_RULE"),
                on_update: row.get("UPDATE_RULE"),
            });
            fk.columns.push(row.get("COLUMN_NAME"));
            fk.references.columns.push(row.get("REFERENCED_COLUMN_NAME"));
        }
        Ok(foreign_keys)
    }
}

/// Table-level metadata as reported by `INFORMATION_SCHEMA.TABLES`.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawTableInfo {
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

/// One `INFORMATION_SCHEMA.COLUMNS` row, untouched.
#[derive(Debug, Clone)]
pub(crate) struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub column_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub extra: String,
    pub comment: String,
    pub char_max_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
}

/// One `INFORMATION_SCHEMA.STATISTICS` row.
#[derive(Debug, Clone)]
pub(crate) struct RawIndexRow {
    pub index_name: String,
    pub column_name: String,
    pub non_unique: i64,
}

/// Group index rows into ordered index definitions, excluding indexes
/// that back a foreign-key constraint (those live with the constraint).
pub(crate) fn group_index_rows(
    rows: Vec<RawIndexRow>,
    fk_names: &HashSet<String>,
) -> IndexMap<String, IndexDef> {
    let mut indexes: IndexMap<String, IndexDef> = IndexMap::new();
    for row in rows {
        if fk_names.contains(&row.index_name) {
            continue;
        }
        let index = indexes.entry(row.index_name).or_insert_with(|| IndexDef {
            columns: Vec::new(),
            unique: row.non_unique == 0,
        });
        index.columns.push(row.column_name);
    }
    indexes
}

/// Build the final definition from fetched parts, applying implicit
/// unique-index detection.
pub(crate) fn assemble_definition(
    table_name: &str,
    info: RawTableInfo,
    raw_columns: Vec<RawColumn>,
    primary_key: Vec<String>,
    mut indexes: IndexMap<String, IndexDef>,
    foreign_keys: IndexMap<String, ForeignKeyDef>,
) -> TableDefinition {
    let mut docs: IndexMap<String, ColumnDoc> = raw_columns
        .iter()
        .map(|raw| (raw.name.clone(), column_doc_from_raw(raw)))
        .collect();

    for column_name in detect_implicit_unique(&docs, &indexes) {
        if let Some(doc) = docs.get_mut(&column_name) {
            doc.unique = Some(true);
        }
        indexes.shift_remove(&format!("uk_{column_name}"));
    }

    let mut table = TableDefinition::new(table_name);
    if let Some(engine) = info.engine {
        table.engine = engine;
    }
    if let Some(collation) = info.collation {
        table.charset = extract_charset(&collation);
        table.collation = collation;
    }
    table.comment = info.comment.filter(|c| !c.is_empty());
    table.columns = docs
        .iter()
        .map(|(name, doc)| (name.clone(), column_from_doc(name, doc)))
        .collect();
    table.primary_key = primary_key;
    table.indexes = indexes;
    table.foreign_keys = foreign_keys;
    table
}

/// Columns whose `uk_<column>` single-column unique index should be
/// reinterpreted as the column's own `unique` attribute.
pub(crate) fn detect_implicit_unique(
    columns: &IndexMap<String, ColumnDoc>,
    indexes: &IndexMap<String, IndexDef>,
) -> Vec<String> {
    let mut implicit = Vec::new();
    for (index_name, index) in indexes {
        if !index.unique || index.columns.len() != 1 {
            continue;
        }
        let column_name = &index.columns[0];
        if index_name != &format!("uk_{column_name}") {
            continue;
        }
        if !columns.contains_key(column_name) {
            continue;
        }
        implicit.push(column_name.clone());
    }
    implicit
}

/// Convert a raw catalog row into the canonical document shape shared
/// with the declared side.
pub(crate) fn column_doc_from_raw(raw: &RawColumn) -> ColumnDoc {
    let sql_type = normalize_type(&raw.data_type, &raw.column_type);
    let extra = raw.extra.to_lowercase();

    let mut doc = ColumnDoc {
        sql_type: Some(sql_type.clone()),
        nullable: Some(raw.is_nullable == "YES"),
        ..ColumnDoc::default()
    };

    if raw.column_type.to_lowercase().contains("unsigned") {
        doc.unsigned = Some(true);
    }
    if extra.contains("auto_increment") {
        doc.auto_increment = Some(true);
    }
    if let Some(length) = raw.char_max_length {
        doc.length = u32::try_from(length).ok();
    }
    if sql_type == "decimal" {
        doc.precision = raw.numeric_precision.and_then(|p| u32::try_from(p).ok());
        doc.scale = raw.numeric_scale.and_then(|s| u32::try_from(s).ok());
    }
    if sql_type == "enum" {
        doc.values = Some(extract_enum_values(&raw.column_type));
    }
    if let Some(default) = &raw.column_default {
        doc.default = normalize_default(default, &sql_type);
    }
    if let Some(on_update) = extract_on_update(&raw.extra) {
        doc.on_update = Some(on_update);
    }
    if !raw.comment.is_empty() {
        doc.comment = Some(raw.comment.clone());
    }

    doc
}

/// Lower-case and alias-fold a reported data type. `tinyint(1)` is the
/// server's spelling of the declared `boolean` type.
pub(crate) fn normalize_type(data_type: &str, column_type: &str) -> String {
    let data_type = data_type.to_lowercase();
    if data_type == "tinyint" && column_type.to_lowercase().starts_with("tinyint(1)") {
        return "boolean".to_string();
    }
    match data_type.as_str() {
        "integer" => "int".to_string(),
        "numeric" => "decimal".to_string(),
        other => other.to_string(),
    }
}

/// Normalize a reported default to the declared-side representation.
/// Returns `None` when the report means "no explicit default".
pub(crate) fn normalize_default(value: &str, sql_type: &str) -> Option<DefaultValue> {
    let upper = value.trim().to_uppercase();

    // The literal string NULL reflects an implicit default, not one the
    // schema declared.
    if upper == "NULL" {
        return None;
    }

    if matches!(
        upper.as_str(),
        "CURRENT_TIMESTAMP" | "CURRENT_TIMESTAMP()" | "NOW()"
    ) {
        return Some(DefaultValue::CurrentTimestamp);
    }

    match sql_type {
        "int" | "bigint" | "tinyint" => Some(
            value
                .parse::<i64>()
                .map(DefaultValue::Int)
                .unwrap_or_else(|_| DefaultValue::Str(value.to_string())),
        ),
        "decimal" => Some(
            value
                .parse::<f64>()
                .map(DefaultValue::Float)
                .unwrap_or_else(|_| DefaultValue::Str(value.to_string())),
        ),
        "boolean" => Some(match value.trim() {
            "1" => DefaultValue::Bool(true),
            "0" => DefaultValue::Bool(false),
            other => DefaultValue::Str(other.to_string()),
        }),
        "varchar" | "char" | "text" | "longtext" | "enum" => {
            Some(DefaultValue::Str(strip_quotes(value).to_string()))
        }
        _ => Some(DefaultValue::Str(value.to_string())),
    }
}

/// Strip one pair of surrounding single quotes, if present.
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// Pull the `on update <keyword>` clause out of the EXTRA column.
pub(crate) fn extract_on_update(extra: &str) -> Option<String> {
    let lower = extra.to_lowercase();
    let pos = lower.find("on update ")?;
    let rest = &extra[pos + "on update ".len()..];
    let keyword = rest.split_whitespace().next()?;
    Some(keyword.to_uppercase())
}

/// Pull the ordered value list out of an `enum('a','b')` COLUMN_TYPE.
pub(crate) fn extract_enum_values(column_type: &str) -> Vec<String> {
    let lower = column_type.to_lowercase();
    if !lower.starts_with("enum(") {
        return Vec::new();
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = column_type.chars().peekable();

    while let Some(c) = chars.next() {
        if !in_quote {
            if c == '\'' {
                in_quote = true;
                current.clear();
            }
            continue;
        }
        if c == '\'' {
            // MySQL doubles quotes inside enum literals.
            if chars.peek() == Some(&'\'') {
                chars.next();
                current.push('\'');
            } else {
                in_quote = false;
                values.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    values
}

/// The charset is the leading component of the collation name.
pub(crate) fn extract_charset(collation: &str) -> String {
    collation
        .split('_')
        .next()
        .unwrap_or("utf8mb4")
        .to_string()
}
