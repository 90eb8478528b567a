// 🏷️ Category Entity - per-user spending/income buckets
//
// `type` is a free-form partition key ("income", "expense", ...). Accounts
// filed under a category must carry the same type.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, timestamp_column};
use crate::error::{LedgerError, Result};

// ============================================================================
// CATEGORY ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub title: String,

    #[serde(rename = "type")]
    pub category_type: String,

    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for a new category
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub user_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub category_type: String,
    pub description: String,
}

/// Mutable fields of a category. Type and owner are fixed at creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub(crate) const CATEGORY_COLUMNS: &str = "id, user_id, title, type, description, created_at";

pub(crate) fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category_type: row.get(3)?,
        description: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

// ============================================================================
// CRUD
// ============================================================================

pub fn create_category(conn: &Connection, new: &NewCategory) -> Result<Category> {
    if new.user_id <= 0 {
        return Err(LedgerError::InvalidRequest("user_id is required".into()));
    }
    if new.title.trim().is_empty() {
        return Err(LedgerError::InvalidRequest("title is required".into()));
    }
    if new.category_type.trim().is_empty() {
        return Err(LedgerError::InvalidRequest("type is required".into()));
    }
    if new.description.trim().is_empty() {
        return Err(LedgerError::InvalidRequest("description is required".into()));
    }

    let now = format_timestamp(&Utc::now());

    conn.query_row(
        &format!(
            "INSERT INTO categories (user_id, title, type, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {CATEGORY_COLUMNS}"
        ),
        params![new.user_id, new.title, new.category_type, new.description, now],
        category_from_row,
    )
    .map_err(|e| LedgerError::from_write(e, &format!("unknown user {}", new.user_id)))
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
        [id],
        category_from_row,
    )
    .map_err(|e| LedgerError::from_lookup(e, &format!("category {id}")))
}

pub fn update_category(conn: &Connection, id: i64, update: &CategoryUpdate) -> Result<Category> {
    conn.query_row(
        &format!(
            "UPDATE categories SET title = ?2, description = ?3
             WHERE id = ?1
             RETURNING {CATEGORY_COLUMNS}"
        ),
        params![id, update.title, update.description],
        category_from_row,
    )
    .map_err(|e| LedgerError::from_lookup(e, &format!("category {id}")))
}

pub fn delete_category(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM categories WHERE id = ?1", [id])
        .map_err(|e| LedgerError::from_write(e, &format!("category {id} still has accounts")))?;

    if deleted == 0 {
        return Err(LedgerError::NotFound(format!("category {id}")));
    }

    Ok(())
}
