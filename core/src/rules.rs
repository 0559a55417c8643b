//! Shared-shape ("format") resolution.
//!
//! Validation rule documents double as reusable column shapes: a table
//! definition can say `"format": "email"` instead of spelling out a type,
//! and the converter derives the concrete database shape from the rule
//! file of that name.
//!
//! Resolution order: an explicit `db` section wins outright; otherwise
//! recognized semantic conditions pick a fixed shape; otherwise the
//! rule's logical value type is mapped to a default shape, sized by
//! `max_length` for strings. Attributes declared on the table side are
//! merged on top and always take precedence.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{MigrateError, Result};
use crate::loader::ColumnDoc;

/// A rule document, reduced to the parts that matter for column shapes.
#[derive(Debug, Clone, Default, Deserialize)]
struct RuleDoc {
    /// Explicit database shape; used verbatim when present.
    db: Option<DbSection>,
    /// Semantic tags such as `email` or `url`.
    #[serde(default)]
    conditions: Vec<String>,
    /// Logical value type: `string`, `int`, `number`, `boolean`.
    #[serde(rename = "type")]
    logical_type: Option<String>,
    /// Maximum string length declared by the validation side.
    max_length: Option<u32>,
}

/// The `db` section of a rule document.
#[derive(Debug, Clone, Default, Deserialize)]
struct DbSection {
    #[serde(rename = "type")]
    sql_type: Option<String>,
    length: Option<u32>,
    unsigned: Option<bool>,
    precision: Option<u32>,
    scale: Option<u32>,
    values: Option<Vec<String>>,
}

/// Resolves `format` references against a directory of rule files.
#[derive(Debug)]
pub struct RuleToColumnConverter {
    rules_dir: PathBuf,
}

impl RuleToColumnConverter {
    /// Fails if the directory does not exist, so a misconfigured rules
    /// path surfaces before any table is loaded.
    pub fn new(rules_dir: impl Into<PathBuf>) -> Result<Self> {
        let rules_dir = rules_dir.into();
        if !rules_dir.is_dir() {
            return Err(MigrateError::RulesDirNotFound(rules_dir));
        }
        Ok(Self { rules_dir })
    }

    /// Resolve a rule name into a concrete column shape and merge the
    /// table-side overrides on top.
    pub fn convert(&self, rule_name: &str, overrides: &ColumnDoc) -> Result<ColumnDoc> {
        let rule = self.load_rule(rule_name)?;
        let base = shape_from_rule(&rule);
        Ok(base.merged_with(overrides))
    }

    fn load_rule(&self, rule_name: &str) -> Result<RuleDoc> {
        let file_name = if rule_name.ends_with(".json") {
            rule_name.to_string()
        } else {
            format!("{rule_name}.json")
        };
        let path = self.rules_dir.join(file_name);

        if !path.is_file() {
            return Err(MigrateError::RuleNotFound(path));
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| MigrateError::InvalidRule {
            path,
            message: e.to_string(),
        })
    }
}

/// Derive the base column shape from a rule document.
fn shape_from_rule(rule: &RuleDoc) -> ColumnDoc {
    if let Some(db) = &rule.db {
        return shape_from_db_section(db, rule);
    }

    for condition in &rule.conditions {
        if let Some(shape) = shape_from_condition(condition) {
            return shape;
        }
    }

    shape_from_logical_type(rule)
}

fn shape_from_db_section(db: &DbSection, rule: &RuleDoc) -> ColumnDoc {
    let sql_type = db.sql_type.clone().unwrap_or_else(|| "varchar".to_string());

    // The validation-side max_length only stands in for a missing length
    // on types that actually carry one.
    let length = db.length.or_else(|| {
        rule.max_length
            .filter(|_| needs_length(&sql_type))
    });

    ColumnDoc {
        sql_type: Some(sql_type),
        length,
        unsigned: db.unsigned,
        precision: db.precision,
        scale: db.scale,
        values: db.values.clone(),
        ..ColumnDoc::default()
    }
}

fn shape_from_condition(condition: &str) -> Option<ColumnDoc> {
    let (sql_type, length) = match condition {
        "email" => ("varchar", Some(254)),
        "url" => ("text", None),
        "color_code" => ("char", Some(7)),
        "datetime" => ("datetime", None),
        "date" => ("date", None),
        _ => return None,
    };
    Some(ColumnDoc {
        sql_type: Some(sql_type.to_string()),
        length,
        ..ColumnDoc::default()
    })
}

fn shape_from_logical_type(rule: &RuleDoc) -> ColumnDoc {
    match rule.logical_type.as_deref().unwrap_or("string") {
        "string" => string_shape(rule.max_length),
        "int" => ColumnDoc {
            sql_type: Some("int".to_string()),
            ..ColumnDoc::default()
        },
        "number" => ColumnDoc {
            sql_type: Some("decimal".to_string()),
            precision: Some(10),
            scale: Some(2),
            ..ColumnDoc::default()
        },
        "boolean" => ColumnDoc {
            sql_type: Some("boolean".to_string()),
            ..ColumnDoc::default()
        },
        _ => ColumnDoc {
            sql_type: Some("varchar".to_string()),
            length: Some(255),
            ..ColumnDoc::default()
        },
    }
}

/// Pick between varchar/text/longtext from the declared maximum length.
fn string_shape(max_length: Option<u32>) -> ColumnDoc {
    let (sql_type, length) = match max_length {
        None => ("varchar", Some(255)),
        Some(n) if n <= 255 => ("varchar", Some(n)),
        Some(n) if n <= 65_535 => ("text", None),
        Some(_) => ("longtext", None),
    };
    ColumnDoc {
        sql_type: Some(sql_type.to_string()),
        length,
        ..ColumnDoc::default()
    }
}

fn needs_length(sql_type: &str) -> bool {
    matches!(sql_type.to_lowercase().as_str(), "varchar" | "char")
}
