// Entity Models
//
// Each entity module owns its row mapping and single-row CRUD. List queries
// with optional filters live in `crate::dispatch`.

pub mod user;
pub mod category;
pub mod account;

pub use user::{create_user, get_user, get_user_by_username, User};
pub use category::{
    create_category, delete_category, get_category, update_category, Category, CategoryUpdate,
    NewCategory,
};
pub use account::{
    account_graph, account_reports, create_account, delete_account, get_account, update_account,
    Account, AccountUpdate, NewAccount,
};
