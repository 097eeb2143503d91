use rusqlite::{Connection, Result};

/// Initialise account and record tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_accounts_table(conn)?;
    create_submit_records_table(conn)?;
    Ok(())
}

fn create_accounts_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            account         TEXT    NOT NULL UNIQUE,
            password        TEXT    NOT NULL,
            steps           INTEGER NOT NULL DEFAULT 89888,
            schedule_hour   INTEGER NOT NULL DEFAULT 0,
            schedule_minute INTEGER NOT NULL DEFAULT 5,
            enabled         INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT    NOT NULL
        );",
    )
}

/// Append-only audit log. `created_at` is fixed-width UTC RFC 3339 so text
/// comparison in range queries matches time ordering.
fn create_submit_records_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS submit_records (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id   INTEGER NOT NULL REFERENCES accounts(id),
            account_name TEXT    NOT NULL,
            steps        INTEGER NOT NULL,
            status       TEXT    NOT NULL,
            message      TEXT,
            raw          TEXT,
            created_at   TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_records_created
            ON submit_records(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_records_account
            ON submit_records(account_id);",
    )
}
