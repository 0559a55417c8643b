//! Column value model.
//!
//! A [`Column`] is an immutable description of a single table column,
//! shared by both sides of every comparison: the loader builds them from
//! declared JSON documents, the inspector rebuilds them from
//! `information_schema`, and the differ compares them with [`Column::equals`].

use serde::Deserialize;

/// A column default, kept as a typed value so literals render without
/// lossy string round-trips.
///
/// `Null` is an *explicit* `DEFAULT NULL`; a column with no default at
/// all carries `None` at the `Column` level instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Explicit NULL default (JSON `null`).
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Canonical form of the timestamp-generation keywords
    /// (`CURRENT_TIMESTAMP`, `CURRENT_TIMESTAMP()`, `NOW()`).
    #[serde(skip)]
    CurrentTimestamp,
}

impl DefaultValue {
    /// Fold recognized keyword strings into their canonical variants so
    /// declared and inspected defaults compare equal.
    pub fn normalized(self) -> Self {
        match self {
            DefaultValue::Str(s) => match s.trim().to_uppercase().as_str() {
                "NULL" => DefaultValue::Null,
                "CURRENT_TIMESTAMP" | "CURRENT_TIMESTAMP()" | "NOW()" => {
                    DefaultValue::CurrentTimestamp
                }
                _ => DefaultValue::Str(s),
            },
            other => other,
        }
    }

    /// Render as the literal that follows `DEFAULT` in DDL.
    pub fn to_sql(&self) -> String {
        match self {
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::Bool(true) => "1".to_string(),
            DefaultValue::Bool(false) => "0".to_string(),
            DefaultValue::Int(n) => n.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Str(s) => format!("'{}'", escape_sql_string(s)),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }
}

/// Escape a string for inclusion in a single-quoted SQL literal.
pub(crate) fn escape_sql_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// One table column.
///
/// Compared by value; `after` is a placement hint for ADD COLUMN only and
/// is excluded from [`Column::equals`] (the derived `PartialEq` includes
/// it and is meant for structural assertions in tests).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Normalized lower-case type tag (`int`, `varchar`, `enum`, ...).
    pub sql_type: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub nullable: bool,
    pub auto_increment: bool,
    /// `None` = no default; `Some(DefaultValue::Null)` = explicit NULL.
    pub default: Option<DefaultValue>,
    pub comment: Option<String>,
    /// Upper-cased keyword, e.g. `CURRENT_TIMESTAMP`.
    pub on_update: Option<String>,
    /// Ordered variants, `enum` columns only.
    pub enum_values: Vec<String>,
    /// Single-column uniqueness expressed inline rather than as a named index.
    pub unique: bool,
    /// Placement hint for ADD COLUMN; never compared or persisted.
    pub after: Option<String>,
}

impl Column {
    /// Create a column with the given name and type; everything else
    /// takes the documented defaults (not null, no default, no extras).
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        let sql_type: String = sql_type.into();
        Self {
            name: name.into(),
            sql_type: sql_type.to_lowercase(),
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            nullable: false,
            auto_increment: false,
            default: None,
            comment: None,
            on_update: None,
            enum_values: Vec::new(),
            unique: false,
            after: None,
        }
    }

    /// Value equality over every attribute that matters for diffing.
    ///
    /// `after` is deliberately ignored: it describes where an ADD COLUMN
    /// lands, not what the column is.
    pub fn equals(&self, other: &Column) -> bool {
        self.name == other.name
            && self.sql_type == other.sql_type
            && self.length == other.length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.unsigned == other.unsigned
            && self.nullable == other.nullable
            && self.auto_increment == other.auto_increment
            && self.default == other.default
            && self.comment == other.comment
            && self.on_update == other.on_update
            && self.enum_values == other.enum_values
            && self.unique == other.unique
    }

    /// Render this column's fragment of a CREATE/ALTER statement.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("`{}` {}", self.name, self.type_sql());

        if self.unsigned && self.is_numeric_type() {
            sql.push_str(" UNSIGNED");
        }

        sql.push_str(if self.nullable { " NULL" } else { " NOT NULL" });

        if self.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }

        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }

        if let Some(on_update) = &self.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(on_update);
        }

        if let Some(comment) = &self.comment {
            sql.push_str(&format!(" COMMENT '{}'", escape_sql_string(comment)));
        }

        sql
    }

    fn type_sql(&self) -> String {
        match self.sql_type.as_str() {
            "int" => "INT".to_string(),
            "bigint" => "BIGINT".to_string(),
            "tinyint" => "TINYINT".to_string(),
            "decimal" => format!(
                "DECIMAL({},{})",
                self.precision.unwrap_or(10),
                self.scale.unwrap_or(0)
            ),
            "varchar" => format!("VARCHAR({})", self.length.unwrap_or(255)),
            "char" => format!("CHAR({})", self.length.unwrap_or(1)),
            "text" => "TEXT".to_string(),
            "longtext" => "LONGTEXT".to_string(),
            "datetime" => "DATETIME".to_string(),
            "timestamp" => "TIMESTAMP".to_string(),
            "date" => "DATE".to_string(),
            "time" => "TIME".to_string(),
            "boolean" => "TINYINT(1)".to_string(),
            "enum" => format!(
                "ENUM({})",
                self.enum_values
                    .iter()
                    .map(|v| format!("'{}'", escape_sql_string(v)))
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            "json" => "JSON".to_string(),
            other => other.to_uppercase(),
        }
    }

    fn is_numeric_type(&self) -> bool {
        matches!(
            self.sql_type.as_str(),
            "int" | "bigint" | "tinyint" | "decimal"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_varchar_column_sql() {
        let mut col = Column::new("email", "varchar");
        col.length = Some(254);
        assert_eq!(col.to_sql(), "`email` VARCHAR(254) NOT NULL");
    }

    #[test]
    fn test_varchar_defaults_to_255() {
        let col = Column::new("title", "varchar");
        assert_eq!(col.to_sql(), "`title` VARCHAR(255) NOT NULL");
    }

    #[test]
    fn test_auto_increment_unsigned_int() {
        let mut col = Column::new("id", "int");
        col.unsigned = true;
        col.auto_increment = true;
        assert_eq!(col.to_sql(), "`id` INT UNSIGNED NOT NULL AUTO_INCREMENT");
    }

    #[test]
    fn test_unsigned_ignored_on_non_numeric() {
        let mut col = Column::new("name", "varchar");
        col.unsigned = true;
        assert_eq!(col.to_sql(), "`name` VARCHAR(255) NOT NULL");
    }

    #[test]
    fn test_decimal_precision_and_scale() {
        let mut col = Column::new("price", "decimal");
        col.precision = Some(10);
        col.scale = Some(2);
        col.unsigned = true;
        assert_eq!(col.to_sql(), "`price` DECIMAL(10,2) UNSIGNED NOT NULL");
    }

    #[test]
    fn test_numeric_default_is_unquoted() {
        let mut col = Column::new("count", "int");
        col.default = Some(DefaultValue::Int(0));
        assert_eq!(col.to_sql(), "`count` INT NOT NULL DEFAULT 0");
    }

    #[test]
    fn test_string_default_is_quoted() {
        let mut col = Column::new("status", "varchar");
        col.length = Some(20);
        col.default = Some(DefaultValue::Str("active".to_string()));
        assert_eq!(
            col.to_sql(),
            "`status` VARCHAR(20) NOT NULL DEFAULT 'active'"
        );
    }

    #[test]
    fn test_timestamp_keyword_default_unquoted() {
        let mut col = Column::new("created_at", "datetime");
        col.default = Some(DefaultValue::Str("NOW()".to_string()).normalized());
        assert_eq!(
            col.to_sql(),
            "`created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_on_update_clause() {
        let mut col = Column::new("updated_at", "datetime");
        col.default = Some(DefaultValue::CurrentTimestamp);
        col.on_update = Some("CURRENT_TIMESTAMP".to_string());
        assert_eq!(
            col.to_sql(),
            "`updated_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_explicit_null_default() {
        let mut col = Column::new("deleted_at", "datetime");
        col.nullable = true;
        col.default = Some(DefaultValue::Null);
        assert_eq!(col.to_sql(), "`deleted_at` DATETIME NULL DEFAULT NULL");
    }

    #[test]
    fn test_boolean_renders_tinyint1() {
        let mut col = Column::new("is_active", "boolean");
        col.default = Some(DefaultValue::Bool(true));
        assert_eq!(col.to_sql(), "`is_active` TINYINT(1) NOT NULL DEFAULT 1");
    }

    #[test]
    fn test_enum_values_quoted_in_order() {
        let mut col = Column::new("state", "enum");
        col.enum_values = vec!["draft".into(), "published".into()];
        assert_eq!(
            col.to_sql(),
            "`state` ENUM('draft','published') NOT NULL"
        );
    }

    #[test]
    fn test_comment_is_escaped() {
        let mut col = Column::new("note", "text");
        col.comment = Some("user's note".to_string());
        assert_eq!(col.to_sql(), "`note` TEXT NOT NULL COMMENT 'user\\'s note'");
    }

    #[test]
    fn test_unknown_type_passes_through_uppercased() {
        let col = Column::new("location", "point");
        assert_eq!(col.to_sql(), "`location` POINT NOT NULL");
    }

    #[test]
    fn test_equals_ignores_after() {
        let mut a = Column::new("email", "varchar");
        a.length = Some(255);
        let mut b = a.clone();
        b.after = Some("id".to_string());
        assert!(a.equals(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_equals_detects_attribute_change() {
        let mut a = Column::new("email", "varchar");
        a.length = Some(255);
        let mut b = a.clone();
        b.length = Some(500);
        assert!(!a.equals(&b));
    }

    #[test]
    fn test_absent_default_differs_from_explicit_null() {
        let a = Column::new("note", "text");
        let mut b = a.clone();
        b.default = Some(DefaultValue::Null);
        assert!(!a.equals(&b));
    }

    #[test]
    fn test_keyword_normalization() {
        assert_eq!(
            DefaultValue::Str("now()".into()).normalized(),
            DefaultValue::CurrentTimestamp
        );
        assert_eq!(
            DefaultValue::Str("CURRENT_TIMESTAMP()".into()).normalized(),
            DefaultValue::CurrentTimestamp
        );
        assert_eq!(
            DefaultValue::Str("NULL".into()).normalized(),
            DefaultValue::Null
        );
        assert_eq!(
            DefaultValue::Str("active".into()).normalized(),
            DefaultValue::Str("active".into())
        );
    }
}
