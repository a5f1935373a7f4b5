// Database schema for the normalized art-space export.
//
// A `schema_version` table records which migrations have run; each
// migration is a closure executing its SQL once.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet. Idempotent.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per art space
        CREATE TABLE IF NOT EXISTS space (
            id INTEGER PRIMARY KEY,
            name TEXT,
            history TEXT,
            activities TEXT,
            presentation TEXT,
            opening_date TEXT,
            closing_date TEXT,
            website TEXT,
            country TEXT,
            city TEXT,
            latitude TEXT,
            longitude TEXT
        );

        -- Survey answers, keyed by the space id
        CREATE TABLE IF NOT EXISTS question_answer (
            id INTEGER PRIMARY KEY,
            question1 TEXT,
            answer1 TEXT,
            question2 TEXT,
            answer2 TEXT
        );

        CREATE TABLE IF NOT EXISTS manager (
            id INTEGER PRIMARY KEY,
            managers TEXT,
            question_answer_id INTEGER REFERENCES question_answer (id)
        );

        -- Which manager runs which space
        CREATE TABLE IF NOT EXISTS holds (
            id INTEGER PRIMARY KEY,
            space_id INTEGER REFERENCES space (id),
            manager_id INTEGER REFERENCES manager (id)
        );
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // v2: entity name lookups for the merge key
    run_migration(conn, 2, |c| {
        c.execute_batch("CREATE INDEX IF NOT EXISTS idx_space_name ON space(name);")
    })?;

    Ok(())
}

fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    }

    Ok(())
}

/// Number of user tables.
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
