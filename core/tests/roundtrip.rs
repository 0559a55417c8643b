//! End-to-end runs over the filesystem: declared definitions are loaded,
//! diffed against a simulated live state, and rendered to DDL.

use drift_core::diff::{DiffOp, SchemaDiffer};
use drift_core::ddl::DdlGenerator;
use drift_core::loader::TableDefinitionLoader;
use drift_core::rules::RuleToColumnConverter;
use indexmap::IndexMap;
use std::fs;
use tempfile::TempDir;

const USERS_V1: &str = r#"{
    "name": "users",
    "columns": {
        "id": {"type": "int", "unsigned": true, "autoIncrement": true},
        "email": {"type": "varchar", "length": 255, "unique": true},
        "content": {"type": "text", "nullable": true},
        "created_at": {"type": "datetime", "default": "CURRENT_TIMESTAMP"}
    },
    "primaryKey": ["id"]
}"#;

const USERS_V2: &str = r#"{
    "name": "users",
    "columns": {
        "id": {"type": "int", "unsigned": true, "autoIncrement": true},
        "email": {"type": "varchar", "length": 255, "unique": true},
        "content": {"type": "text", "nullable": true},
        "created_at": {"type": "datetime", "default": "CURRENT_TIMESTAMP"},
        "user_name": {"type": "varchar", "length": 100, "after": "email"}
    },
    "primaryKey": ["id"]
}"#;

fn write_tables(dir: &TempDir, files: &[(&str, &str)]) {
    for (name, json) in files {
        fs::write(dir.path().join(name), json).unwrap();
    }
}

#[test]
fn same_declaration_twice_produces_no_diff() {
    let dir = TempDir::new().unwrap();
    write_tables(&dir, &[("users.json", USERS_V1)]);

    let loader = TableDefinitionLoader::new(None);
    let a = loader.load_dir(dir.path()).unwrap();
    let b = loader.load_dir(dir.path()).unwrap();

    let diffs = SchemaDiffer::new().diff_all(&a, &b, true);
    assert!(diffs.is_empty(), "expected no diffs, got {diffs:?}");
}

#[test]
fn adding_one_column_yields_exactly_one_add() {
    // The historical regression: the added column must not drag the
    // unchanged text and keyword-default datetime columns into MODIFY.
    let v1_dir = TempDir::new().unwrap();
    let v2_dir = TempDir::new().unwrap();
    write_tables(&v1_dir, &[("users.json", USERS_V1)]);
    write_tables(&v2_dir, &[("users.json", USERS_V2)]);

    let loader = TableDefinitionLoader::new(None);
    let live = loader.load_dir(v1_dir.path()).unwrap();
    let desired = loader.load_dir(v2_dir.path()).unwrap();

    let diffs = SchemaDiffer::new().diff_all(&desired, &live, false);
    assert_eq!(diffs.len(), 1, "expected a single diff, got {diffs:?}");
    match &diffs[0] {
        DiffOp::AddColumn { table, column } => {
            assert_eq!(table, "users");
            assert_eq!(column.name, "user_name");
        }
        other => panic!("expected AddColumn, got {other:?}"),
    }

    let sql = DdlGenerator::new().generate(&diffs);
    assert_eq!(
        sql,
        "-- Table: users - add column: user_name\n\
         ALTER TABLE `users` ADD COLUMN `user_name` VARCHAR(100) NOT NULL AFTER `email`;"
    );
}

#[test]
fn fresh_database_renders_full_create_script() {
    let dir = TempDir::new().unwrap();
    write_tables(
        &dir,
        &[
            ("01_users.json", USERS_V1),
            (
                "02_posts.json",
                r#"{
                    "name": "posts",
                    "columns": {
                        "id": {"type": "int", "unsigned": true, "autoIncrement": true},
                        "user_id": {"type": "int", "unsigned": true},
                        "title": {"type": "varchar", "length": 200}
                    },
                    "primaryKey": ["id"],
                    "indexes": {"idx_user": {"columns": ["user_id"]}},
                    "foreignKeys": {
                        "fk_posts_user": {
                            "columns": ["user_id"],
                            "references": {"table": "users", "columns": ["id"]},
                            "onDelete": "CASCADE"
                        }
                    }
                }"#,
            ),
        ],
    );

    let desired = TableDefinitionLoader::new(None).load_dir(dir.path()).unwrap();
    let diffs = SchemaDiffer::new().diff_all(&desired, &IndexMap::new(), false);

    assert_eq!(diffs.len(), 2);
    assert!(matches!(&diffs[0], DiffOp::CreateTable { table, .. } if table == "users"));
    assert!(matches!(&diffs[1], DiffOp::CreateTable { table, .. } if table == "posts"));

    let sql = DdlGenerator::new().generate(&diffs);
    assert!(sql.contains("CREATE TABLE `users` ("));
    assert!(sql.contains("UNIQUE KEY `uk_email` (`email`)"));
    assert!(sql.contains("CREATE TABLE `posts` ("));
    assert!(sql.contains("KEY `idx_user` (`user_id`)"));
    assert!(sql.contains(
        "CONSTRAINT `fk_posts_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) \
         ON DELETE CASCADE ON UPDATE RESTRICT"
    ));
}

#[test]
fn format_references_resolve_through_rules_dir() {
    let rules = TempDir::new().unwrap();
    fs::write(
        rules.path().join("email.json"),
        r#"{"type": "string", "conditions": ["email"]}"#,
    )
    .unwrap();
    fs::write(
        rules.path().join("price.json"),
        r#"{"type": "number", "db": {"type": "decimal", "precision": 12, "scale": 4}}"#,
    )
    .unwrap();

    let tables = TempDir::new().unwrap();
    write_tables(
        &tables,
        &[(
            "products.json",
            r#"{
                "name": "products",
                "columns": {
                    "id": {"type": "int", "unsigned": true, "autoIncrement": true},
                    "contact": {"format": "email", "nullable": true},
                    "price": {"format": "price", "unsigned": true}
                },
                "primaryKey": ["id"]
            }"#,
        )],
    );

    let converter = RuleToColumnConverter::new(rules.path()).unwrap();
    let loaded = TableDefinitionLoader::new(Some(converter))
        .load_dir(tables.path())
        .unwrap();

    let products = &loaded["products"];
    let contact = products.column("contact").unwrap();
    assert_eq!(contact.sql_type, "varchar");
    assert_eq!(contact.length, Some(254));
    assert!(contact.nullable);

    let price = products.column("price").unwrap();
    assert_eq!(price.sql_type, "decimal");
    assert_eq!(price.precision, Some(12));
    assert_eq!(price.scale, Some(4));
    assert!(price.unsigned);

    let diffs = SchemaDiffer::new().diff_all(&loaded, &IndexMap::new(), false);
    let sql = DdlGenerator::new().generate(&diffs);
    assert!(sql.contains("`contact` VARCHAR(254) NULL"));
    assert!(sql.contains("`price` DECIMAL(12,4) UNSIGNED NOT NULL"));
}

#[test]
fn index_change_renders_drop_then_create() {
    let old_dir = TempDir::new().unwrap();
    let new_dir = TempDir::new().unwrap();
    write_tables(
        &old_dir,
        &[(
            "t.json",
            r#"{"name": "t",
                "columns": {"a": {"type": "int"}, "b": {"type": "int"}},
                "indexes": {"idx_a": {"columns": ["a"]}}}"#,
        )],
    );
    write_tables(
        &new_dir,
        &[(
            "t.json",
            r#"{"name": "t",
                "columns": {"a": {"type": "int"}, "b": {"type": "int"}},
                "indexes": {"idx_a": {"columns": ["a", "b"], "unique": true}}}"#,
        )],
    );

    let loader = TableDefinitionLoader::new(None);
    let live = loader.load_dir(old_dir.path()).unwrap();
    let desired = loader.load_dir(new_dir.path()).unwrap();

    let diffs = SchemaDiffer::new().diff_all(&desired, &live, false);
    let sql = DdlGenerator::new().generate(&diffs);

    let drop_pos = sql.find("DROP INDEX `idx_a` ON `t`;").expect("drop missing");
    let create_pos = sql
        .find("CREATE UNIQUE INDEX `idx_a` ON `t` (`a`, `b`);")
        .expect("create missing");
    assert!(drop_pos < create_pos);
}
