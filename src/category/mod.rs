//! Spending categories and their listing.

mod db;
mod domain;
mod list;

pub use db::{create_category_table, get_or_create_category};
pub use domain::Category;
pub use list::get_categories;
