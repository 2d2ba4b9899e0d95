//! Sets up the application's SQLite database.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error, category::create_category_table, spending::create_spending_table,
    summary::create_summary_table,
};

/// Create the tables for the application's data if they do not exist.
///
/// Foreign key enforcement is switched on for `connection`.
///
/// # Errors
/// Returns an [Error::SqlError] if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Has no effect inside a transaction, so it must come first.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_category_table(&transaction)?;
    create_spending_table(&transaction)?;
    create_summary_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
