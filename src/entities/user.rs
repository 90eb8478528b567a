// User Entity - owner of categories and accounts

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, timestamp_column};
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,

    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub password: String,

    pub email: String,
    pub created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, username, password, email, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        email: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

/// Insert a user. `password_hash` must already be hashed.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    email: &str,
) -> Result<User> {
    if username.trim().is_empty() {
        return Err(LedgerError::InvalidRequest("username is required".into()));
    }
    if email.trim().is_empty() {
        return Err(LedgerError::InvalidRequest("email is required".into()));
    }

    let now = format_timestamp(&Utc::now());

    conn.query_row(
        &format!(
            "INSERT INTO users (username, password, email, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {USER_COLUMNS}"
        ),
        params![username, password_hash, email, now],
        user_from_row,
    )
    .map_err(|e| LedgerError::from_write(e, "username or email already registered"))
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        user_from_row,
    )
    .map_err(|e| LedgerError::from_lookup(e, &format!("user {id}")))
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<User> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        [username],
        user_from_row,
    )
    .map_err(|e| LedgerError::from_lookup(e, &format!("user {username}")))
}
