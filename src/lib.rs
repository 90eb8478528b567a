// Finance Ledger - Core Library
// Exposes all modules for use in the admin CLI, the API server, and tests

pub mod config;
pub mod error;
pub mod db;
pub mod entities;
pub mod filter;   // Filter Predicate Evaluator
pub mod dispatch; // Query Dispatch Table
pub mod auth;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use error::{LedgerError, Result};
pub use db::{open_database, setup_database};
pub use entities::{
    Account, AccountUpdate, NewAccount,
    Category, CategoryUpdate, NewCategory,
    User,
};
pub use filter::{
    AccountFilter, AccountVariant, CategoryFilter, CategoryVariant,
    FilterCriteria, FilterField, QueryVariant, Selection,
};
pub use dispatch::{account_query, category_query, list_accounts, list_categories, PreparedQuery};
pub use auth::{Claims, TokenKeys};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
