//! Spending records: creating them from webhook replies and listing them.

mod create;
mod db;
mod domain;
mod list;
mod service;

pub use create::create_spending_endpoint;
pub use db::create_spending_table;
pub use domain::Spending;
pub use list::get_spendings;
