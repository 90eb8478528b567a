// 🗂️ Query Dispatch Table
//
// One SQL template per variant. Owner and type are always ?1 and ?2; the
// variant's own fields follow in the order `QueryVariant::fields` lists them.
// Nothing outside that list is ever bound. Title and description match as
// case-sensitive substrings via instr(), so user text is never a pattern.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use crate::db::format_timestamp;
use crate::entities::account::{account_from_row, Account};
use crate::entities::category::{category_from_row, Category};
use crate::error::Result;
use crate::filter::{AccountVariant, CategoryVariant, FilterCriteria, FilterField, QueryVariant, Selection};

macro_rules! accounts_where {
    ($tail:literal) => {
        concat!(
            "SELECT id, user_id, category_id, title, type, description, value, date, created_at
             FROM accounts
             WHERE user_id = ?1 AND type = ?2",
            $tail
        )
    };
}

macro_rules! categories_where {
    ($tail:literal) => {
        concat!(
            "SELECT id, user_id, title, type, description, created_at
             FROM categories
             WHERE user_id = ?1 AND type = ?2",
            $tail
        )
    };
}

impl AccountVariant {
    pub fn sql(self) -> &'static str {
        match self {
            AccountVariant::ByOwnerAndType => accounts_where!(""),
            AccountVariant::ByOwnerTypeCategory => accounts_where!(" AND category_id = ?3"),
            AccountVariant::ByOwnerTypeCategoryTitle => accounts_where!(
                " AND category_id = ?3
                  AND instr(title, ?4) > 0"
            ),
            AccountVariant::ByOwnerTypeCategoryTitleDescription => accounts_where!(
                " AND category_id = ?3
                  AND instr(title, ?4) > 0
                  AND instr(description, ?5) > 0"
            ),
            AccountVariant::ByOwnerTypeDate => accounts_where!(" AND date = ?3"),
            AccountVariant::ByOwnerTypeDescription => {
                accounts_where!(" AND instr(description, ?3) > 0")
            }
            AccountVariant::ByOwnerTypeTitle => {
                accounts_where!(" AND instr(title, ?3) > 0")
            }
            AccountVariant::ByAllFields => accounts_where!(
                " AND category_id = ?3
                  AND instr(title, ?4) > 0
                  AND instr(description, ?5) > 0
                  AND date = ?6"
            ),
        }
    }
}

impl CategoryVariant {
    pub fn sql(self) -> &'static str {
        match self {
            CategoryVariant::ByOwnerAndType => categories_where!(""),
            CategoryVariant::ByOwnerTypeDescription => {
                categories_where!(" AND instr(description, ?3) > 0")
            }
            CategoryVariant::ByOwnerTypeTitle => {
                categories_where!(" AND instr(title, ?3) > 0")
            }
            CategoryVariant::ByOwnerTypeTitleDescription => categories_where!(
                " AND instr(title, ?3) > 0
                  AND instr(description, ?4) > 0"
            ),
        }
    }
}

/// A variant's template together with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery<V: QueryVariant> {
    pub variant: V,
    pub sql: &'static str,
    pub params: Vec<Value>,
}

fn field_value(criteria: &FilterCriteria, field: FilterField) -> Value {
    // A hand-built Selection could name a field it never filled; Null then
    // matches no rows.
    match field {
        FilterField::Category => criteria.category_id.map(Value::Integer),
        FilterField::Date => criteria.date.map(|d| Value::Text(format_timestamp(&d))),
        FilterField::Description => criteria.description.clone().map(Value::Text),
        FilterField::Title => criteria.title.clone().map(Value::Text),
    }
    .unwrap_or(Value::Null)
}

fn bind<V: QueryVariant>(selection: &Selection<V>, sql: &'static str) -> PreparedQuery<V> {
    let criteria = &selection.criteria;
    let mut params = vec![
        Value::Integer(criteria.owner),
        Value::Text(criteria.kind.clone()),
    ];
    params.extend(
        selection
            .variant
            .fields()
            .iter()
            .map(|field| field_value(criteria, *field)),
    );

    PreparedQuery {
        variant: selection.variant,
        sql,
        params,
    }
}

pub fn account_query(selection: &Selection<AccountVariant>) -> PreparedQuery<AccountVariant> {
    bind(selection, selection.variant.sql())
}

pub fn category_query(selection: &Selection<CategoryVariant>) -> PreparedQuery<CategoryVariant> {
    bind(selection, selection.variant.sql())
}

fn run<V, T, F>(conn: &Connection, query: &PreparedQuery<V>, map_row: F) -> Result<Vec<T>>
where
    V: QueryVariant,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare_cached(query.sql)?;
    let rows = stmt
        .query_map(params_from_iter(query.params.iter()), map_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Run the selected account variant. Rows come back in store order.
pub fn list_accounts(conn: &Connection, selection: &Selection<AccountVariant>) -> Result<Vec<Account>> {
    run(conn, &account_query(selection), account_from_row)
}

/// Run the selected category variant. Rows come back in store order.
pub fn list_categories(
    conn: &Connection,
    selection: &Selection<CategoryVariant>,
) -> Result<Vec<Category>> {
    run(conn, &category_query(selection), category_from_row)
}
