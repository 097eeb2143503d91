use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use rusqlite::{types::Type, Connection, ErrorCode, OptionalExtension};
use stepsync_core::store::{AccountSource, RecordSink};
use stepsync_core::{Account, AccountId, NewSubmitRecord, SubmitRecord, SubmitStatus};
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::types::{AccountCounts, AccountPatch, DayCounts, NewAccount, Statistics};

/// Default page size for record listings.
pub const DEFAULT_RECORD_LIMIT: usize = 200;

const ACCOUNT_COLUMNS: &str =
    "id, account, password, steps, schedule_hour, schedule_minute, enabled, created_at";
const RECORD_COLUMNS: &str =
    "id, account_id, account_name, steps, status, message, raw, created_at";

/// SQLite-backed account and submit-record store.
///
/// Wraps a single connection in a `Mutex`; every call is a short statement,
/// so contention stays low at the expected handful of accounts.
pub struct AccountStore {
    db: Mutex<Connection>,
    tz: Tz,
}

impl AccountStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection, tz: Tz) -> Self {
        Self {
            db: Mutex::new(conn),
            tz,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite half-written, so
        // a poisoned guard is still usable.
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All accounts, newest first.
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map([], |row| row_to_account(row, self.tz))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let db = self.conn();
        query_account(&db, self.tz, id)
    }

    pub fn count_accounts(&self) -> Result<u64> {
        let db = self.conn();
        let n: i64 = db.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    #[instrument(skip(self, new), fields(login = %new.login))]
    pub fn create_account(&self, new: NewAccount) -> Result<Account> {
        let created_at = Utc::now().with_timezone(&self.tz);
        let db = self.conn();
        db.execute(
            "INSERT INTO accounts
             (account, password, steps, schedule_hour, schedule_minute, enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                new.login,
                new.password,
                new.steps,
                new.schedule_hour,
                new.schedule_minute,
                new.enabled,
                encode_ts(&created_at),
            ],
        )
        .map_err(|e| map_unique(e, &new.login))?;

        let id = AccountId(db.last_insert_rowid());
        info!(account_id = %id, "account created");
        Ok(Account {
            id,
            login: new.login,
            password: new.password,
            steps: new.steps,
            schedule_hour: new.schedule_hour,
            schedule_minute: new.schedule_minute,
            enabled: new.enabled,
            created_at,
        })
    }

    /// Apply `patch` over the stored account and return the merged result.
    #[instrument(skip(self, patch), fields(account_id = %id))]
    pub fn update_account(&self, id: AccountId, patch: AccountPatch) -> Result<Account> {
        let db = self.conn();
        let mut account =
            query_account(&db, self.tz, id)?.ok_or(StoreError::NotFound { id: id.get() })?;

        if let Some(login) = patch.login {
            account.login = login;
        }
        if let Some(password) = patch.password {
            account.password = password;
        }
        if let Some(steps) = patch.steps {
            account.steps = steps;
        }
        if let Some(hour) = patch.schedule_hour {
            account.schedule_hour = hour;
        }
        if let Some(minute) = patch.schedule_minute {
            account.schedule_minute = minute;
        }
        if let Some(enabled) = patch.enabled {
            account.enabled = enabled;
        }

        db.execute(
            "UPDATE accounts
             SET account = ?1, password = ?2, steps = ?3,
                 schedule_hour = ?4, schedule_minute = ?5, enabled = ?6
             WHERE id = ?7",
            rusqlite::params![
                account.login,
                account.password,
                account.steps,
                account.schedule_hour,
                account.schedule_minute,
                account.enabled,
                id.get(),
            ],
        )
        .map_err(|e| map_unique(e, &account.login))?;

        debug!("account updated");
        Ok(account)
    }

    /// Flip `enabled` and return the updated account.
    pub fn toggle_account(&self, id: AccountId) -> Result<Account> {
        let db = self.conn();
        let n = db.execute(
            "UPDATE accounts SET enabled = NOT enabled WHERE id = ?1",
            [id.get()],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.get() });
        }
        query_account(&db, self.tz, id)?.ok_or(StoreError::NotFound { id: id.get() })
    }

    /// Delete an account together with its submit records.
    #[instrument(skip(self), fields(account_id = %id))]
    pub fn delete_account(&self, id: AccountId) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let records = tx.execute(
            "DELETE FROM submit_records WHERE account_id = ?1",
            [id.get()],
        )?;
        let n = tx.execute("DELETE FROM accounts WHERE id = ?1", [id.get()])?;
        if n == 0 {
            return Err(StoreError::NotFound { id: id.get() });
        }
        tx.commit()?;
        info!(records, "account deleted");
        Ok(())
    }

    pub fn insert_record(&self, record: NewSubmitRecord) -> Result<SubmitRecord> {
        let db = self.conn();
        db.execute(
            "INSERT INTO submit_records
             (account_id, account_name, steps, status, message, raw, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                record.account_id.get(),
                record.account_name,
                record.steps,
                record.status.to_string(),
                record.message,
                record.raw,
                encode_ts(&record.created_at),
            ],
        )?;
        Ok(SubmitRecord::from_new(db.last_insert_rowid(), record))
    }

    /// Newest `limit` records across all accounts.
    pub fn list_records(&self, limit: usize) -> Result<Vec<SubmitRecord>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM submit_records ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map([limit as i64], |row| row_to_record(row, self.tz))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Records created on the local calendar day containing `now`, newest first.
    pub fn records_for_day(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<SubmitRecord>> {
        let (start, end) = local_day_bounds(now, self.tz)?;
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM submit_records
             WHERE created_at >= ?1 AND created_at < ?2
             ORDER BY id DESC LIMIT ?3"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![start, end, limit as i64],
            |row| row_to_record(row, self.tz),
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Account totals plus today's success/failure counts.
    pub fn statistics(&self, now: DateTime<Utc>) -> Result<Statistics> {
        let (start, end) = local_day_bounds(now, self.tz)?;
        let db = self.conn();

        let (total, enabled): (i64, i64) = db.query_row(
            "SELECT COUNT(*), COALESCE(SUM(enabled), 0) FROM accounts",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let count_status = |status: SubmitStatus| -> rusqlite::Result<i64> {
            db.query_row(
                "SELECT COUNT(*) FROM submit_records
                 WHERE created_at >= ?1 AND created_at < ?2 AND status = ?3",
                rusqlite::params![start, end, status.to_string()],
                |row| row.get(0),
            )
        };
        let success = count_status(SubmitStatus::Success)?;
        let failed = count_status(SubmitStatus::Failed)?;

        Ok(Statistics {
            accounts: AccountCounts {
                total: total as u64,
                enabled: enabled as u64,
            },
            today: DayCounts {
                success: success as u64,
                failed: failed as u64,
            },
        })
    }
}

impl AccountSource for AccountStore {
    fn list_accounts(&self) -> stepsync_core::Result<Vec<Account>> {
        Ok(AccountStore::list_accounts(self)?)
    }

    fn get_account(&self, id: AccountId) -> stepsync_core::Result<Option<Account>> {
        Ok(AccountStore::get_account(self, id)?)
    }
}

impl RecordSink for AccountStore {
    fn insert_record(&self, record: NewSubmitRecord) -> stepsync_core::Result<SubmitRecord> {
        Ok(AccountStore::insert_record(self, record)?)
    }
}

fn query_account(conn: &Connection, tz: Tz, id: AccountId) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
            [id.get()],
            |row| row_to_account(row, tz),
        )
        .optional()?;
    Ok(account)
}

fn map_unique(e: rusqlite::Error, login: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Duplicate {
                login: login.to_string(),
            }
        }
        other => StoreError::Database(other),
    }
}

/// Fixed-width UTC encoding: text order equals chronological order.
fn encode_ts<T: TimeZone>(dt: &DateTime<T>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(idx: usize, raw: &str, tz: Tz) -> rusqlite::Result<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&tz))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// UTC bounds `[start, end)` of the local day containing `now`, encoded for
/// comparison against stored timestamps.
fn local_day_bounds(now: DateTime<Utc>, tz: Tz) -> Result<(String, String)> {
    let date = now.with_timezone(&tz).date_naive();
    let start = local_midnight(date, tz)?;
    let end = local_midnight(date + Duration::days(1), tz)?;
    Ok((encode_ts(&start), encode_ts(&end)))
}

fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>> {
    // Zones that skip midnight on a DST change start the day at 01:00.
    [0, 1]
        .into_iter()
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .ok_or_else(|| StoreError::InvalidTimestamp(format!("no local midnight on {date}")))
}

fn row_to_account(row: &rusqlite::Row<'_>, tz: Tz) -> rusqlite::Result<Account> {
    let created_at: String = row.get(7)?;
    Ok(Account {
        id: AccountId(row.get(0)?),
        login: row.get(1)?,
        password: row.get(2)?,
        steps: row.get(3)?,
        schedule_hour: row.get(4)?,
        schedule_minute: row.get(5)?,
        enabled: row.get(6)?,
        created_at: decode_ts(7, &created_at, tz)?,
    })
}

fn row_to_record(row: &rusqlite::Row<'_>, tz: Tz) -> rusqlite::Result<SubmitRecord> {
    let status: String = row.get(4)?;
    let status = status.parse::<SubmitStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
    })?;
    let created_at: String = row.get(7)?;
    Ok(SubmitRecord {
        id: row.get(0)?,
        account_id: AccountId(row.get(1)?),
        account_name: row.get(2)?,
        steps: row.get(3)?,
        status,
        message: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        raw: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        created_at: decode_ts(7, &created_at, tz)?,
    })
}
