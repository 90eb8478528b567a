// 💳 Account Entity - a single ledger entry
//
// A titled, dated, valued transaction filed under a category. The account's
// type must equal its category's type; that is checked at creation only.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, timestamp_column};
use crate::entities::category::get_category;
use crate::error::{LedgerError, Result};
use crate::filter::is_zero_timestamp;

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,

    #[serde(rename = "type")]
    pub account_type: String,

    pub description: String,

    /// Signed amount in minor units (cents)
    pub value: i64,

    /// When the transaction happened
    pub date: DateTime<Utc>,

    /// When the row was written (server-assigned)
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub description: String,
    pub value: i64,
    /// Stored at microsecond precision; finer digits are truncated, and the
    /// created record returns the stored value.
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountUpdate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub value: i64,
}

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, user_id, category_id, title, type, description, value, date, created_at";

pub(crate) fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        account_type: row.get(4)?,
        description: row.get(5)?,
        value: row.get(6)?,
        date: timestamp_column(row, 7)?,
        created_at: timestamp_column(row, 8)?,
    })
}

impl NewAccount {
    fn check_required(&self) -> Result<()> {
        let missing = if self.user_id <= 0 {
            Some("user_id")
        } else if self.category_id <= 0 {
            Some("category_id")
        } else if self.title.trim().is_empty() {
            Some("title")
        } else if self.account_type.trim().is_empty() {
            Some("type")
        } else if self.description.trim().is_empty() {
            Some("description")
        } else if is_zero_timestamp(&self.date) {
            Some("date")
        } else {
            None
        };

        match missing {
            Some(field) => Err(LedgerError::InvalidRequest(format!("{field} is required"))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// CRUD
// ============================================================================

/// Insert an account after checking it against its category.
///
/// The category lookup is read-only, so a failure at any step leaves nothing
/// behind.
pub fn create_account(conn: &Connection, new: &NewAccount) -> Result<Account> {
    new.check_required()?;

    let category = get_category(conn, new.category_id)?;
    if category.category_type != new.account_type {
        return Err(LedgerError::Validation(format!(
            "account type '{}' does not match category type '{}'",
            new.account_type, category.category_type
        )));
    }

    let now = format_timestamp(&Utc::now());

    conn.query_row(
        &format!(
            "INSERT INTO accounts (user_id, category_id, title, type, description, value, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {ACCOUNT_COLUMNS}"
        ),
        params![
            new.user_id,
            new.category_id,
            new.title,
            new.account_type,
            new.description,
            new.value,
            format_timestamp(&new.date),
            now,
        ],
        account_from_row,
    )
    .map_err(|e| LedgerError::from_write(e, &format!("unknown user {}", new.user_id)))
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        [id],
        account_from_row,
    )
    .map_err(|e| LedgerError::from_lookup(e, &format!("account {id}")))
}

pub fn update_account(conn: &Connection, id: i64, update: &AccountUpdate) -> Result<Account> {
    conn.query_row(
        &format!(
            "UPDATE accounts SET title = ?2, description = ?3, value = ?4
             WHERE id = ?1
             RETURNING {ACCOUNT_COLUMNS}"
        ),
        params![id, update.title, update.description, update.value],
        account_from_row,
    )
    .map_err(|e| LedgerError::from_lookup(e, &format!("account {id}")))
}

pub fn delete_account(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?;

    if deleted == 0 {
        return Err(LedgerError::NotFound(format!("account {id}")));
    }

    Ok(())
}

// ============================================================================
// AGGREGATES
// ============================================================================

/// Number of accounts an owner has of a given type
pub fn account_graph(conn: &Connection, user_id: i64, account_type: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE user_id = ?1 AND type = ?2",
        params![user_id, account_type],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Sum of values an owner has of a given type (0 when there are none)
pub fn account_reports(conn: &Connection, user_id: i64, account_type: &str) -> Result<i64> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(value), 0) FROM accounts WHERE user_id = ?1 AND type = ?2",
        params![user_id, account_type],
        |row| row.get(0),
    )?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::entities::category::{create_category, NewCategory};
    use crate::entities::user::create_user;
    use chrono::{TimeZone, Timelike};

    struct Fixture {
        conn: Connection,
        user_id: i64,
        expense_id: i64,
    }

    fn fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let user = create_user(&conn, "owner", "hash", "owner@example.com").unwrap();
        let expense = create_category(
            &conn,
            &NewCategory {
                user_id: user.id,
                title: "Rent".to_string(),
                category_type: "expense".to_string(),
                description: "Monthly rent".to_string(),
            },
        )
        .unwrap();

        Fixture {
            conn,
            user_id: user.id,
            expense_id: expense.id,
        }
    }

    fn rent(f: &Fixture, account_type: &str, value: i64) -> NewAccount {
        NewAccount {
            user_id: f.user_id,
            category_id: f.expense_id,
            title: "March rent".to_string(),
            account_type: account_type.to_string(),
            description: "Paid by transfer".to_string(),
            value,
            date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn account_rows(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_create_account_matching_type() {
        let f = fixture();
        let new = rent(&f, "expense", -120_000);
        let account = create_account(&f.conn, &new).unwrap();

        assert_eq!(account.user_id, new.user_id);
        assert_eq!(account.category_id, new.category_id);
        assert_eq!(account.title, new.title);
        assert_eq!(account.account_type, new.account_type);
        assert_eq!(account.description, new.description);
        assert_eq!(account.value, new.value);
        assert_eq!(account.date, new.date);

        assert_eq!(get_account(&f.conn, account.id).unwrap(), account);
    }

    #[test]
    fn test_date_kept_to_microseconds() {
        let f = fixture();
        let mut new = rent(&f, "expense", -1);
        new.date = Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();

        let account = create_account(&f.conn, &new).unwrap();
        assert_eq!(account.date.nanosecond(), 123_456_000);
        assert_eq!(get_account(&f.conn, account.id).unwrap().date, account.date);

        // Filtering by the original instant truncates the same way
        let selection = crate::filter::AccountFilter {
            user_id: Some(f.user_id),
            account_type: Some("expense".to_string()),
            date: Some(new.date),
            ..Default::default()
        }
        .evaluate()
        .unwrap();
        let found = crate::dispatch::list_accounts(&f.conn, &selection).unwrap();
        assert_eq!(found, vec![account]);
    }

    #[test]
    fn test_type_mismatch_writes_nothing() {
        let f = fixture();
        let err = create_account(&f.conn, &rent(&f, "income", 500)).unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(account_rows(&f.conn), 0);
    }

    #[test]
    fn test_unknown_category_is_not_found() {
        let f = fixture();
        let mut new = rent(&f, "expense", 1);
        new.category_id = 999;

        let err = create_account(&f.conn, &new).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert_eq!(account_rows(&f.conn), 0);
    }

    #[test]
    fn test_zero_date_rejected() {
        let f = fixture();
        let mut new = rent(&f, "expense", 1);
        new.date = crate::filter::zero_timestamp();

        let err = create_account(&f.conn, &new).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(ref m) if m.contains("date")));
    }

    #[test]
    fn test_update_and_delete_account() {
        let f = fixture();
        let account = create_account(&f.conn, &rent(&f, "expense", -100)).unwrap();

        let updated = update_account(
            &f.conn,
            account.id,
            &AccountUpdate {
                title: "April rent".to_string(),
                description: "Paid late".to_string(),
                value: -150,
            },
        )
        .unwrap();

        assert_eq!(updated.title, "April rent");
        assert_eq!(updated.value, -150);
        assert_eq!(updated.date, account.date);
        assert_eq!(updated.account_type, "expense");

        delete_account(&f.conn, account.id).unwrap();
        assert!(matches!(get_account(&f.conn, account.id), Err(LedgerError::NotFound(_))));
        assert!(matches!(delete_account(&f.conn, account.id), Err(LedgerError::NotFound(_))));
    }

    #[test]
    fn test_category_with_accounts_cannot_be_deleted() {
        let f = fixture();
        create_account(&f.conn, &rent(&f, "expense", -100)).unwrap();

        let err = crate::entities::category::delete_category(&f.conn, f.expense_id).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_graph_and_reports() {
        let f = fixture();
        assert_eq!(account_graph(&f.conn, f.user_id, "expense").unwrap(), 0);
        assert_eq!(account_reports(&f.conn, f.user_id, "expense").unwrap(), 0);

        create_account(&f.conn, &rent(&f, "expense", -100)).unwrap();
        create_account(&f.conn, &rent(&f, "expense", -250)).unwrap();

        assert_eq!(account_graph(&f.conn, f.user_id, "expense").unwrap(), 2);
        assert_eq!(account_reports(&f.conn, f.user_id, "expense").unwrap(), -350);
        assert_eq!(account_graph(&f.conn, f.user_id, "income").unwrap(), 0);
    }
}
