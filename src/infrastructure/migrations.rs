//! 数据库迁移
//!
//! 在 `_migrations` 表中记录已执行的版本，按顺序执行未执行的迁移。

use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_requirements_table",
        sql: "CREATE TABLE IF NOT EXISTS requirements (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                location TEXT NOT NULL,
                grade_band TEXT NOT NULL,
                requirements TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_requirements_grade_band ON requirements(grade_band);",
    },
    Migration {
        version: 2,
        description: "create_corpus_tables",
        sql: "CREATE TABLE IF NOT EXISTS baseline_corpus (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS corpus_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                added_at TEXT NOT NULL
            );",
    },
    Migration {
        version: 3,
        description: "create_submissions_table",
        sql: "CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identity TEXT NOT NULL UNIQUE,
                student_name TEXT,
                text TEXT NOT NULL,
                score INTEGER NOT NULL,
                report TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
    },
];

/// 执行所有未执行的迁移
pub fn run_all(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            "执行数据库迁移 v{}: {}",
            migration.version, migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}
