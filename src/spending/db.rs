//! Database operations for spending.

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use uuid::Uuid;

use crate::{
    Error,
    pagination::{Pagination, like_pattern},
    spending::Spending,
};

/// Restricts which spending [query_spendings] returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpendingFilter {
    /// Only spending of this owner.
    pub owner: Option<Uuid>,
    /// Only spending whose name, description or category contains this string.
    pub search: Option<String>,
}

/// Insert a spending record.
///
/// # Errors
/// Returns [Error::Conflict] if a record with the same ID exists.
pub fn insert_spending(spending: &Spending, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO spending (id, user_session_id, category, category_id, name, amount,
            description, datetime, is_confirm, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        (
            spending.id,
            spending.user_session_id,
            &spending.category,
            spending.category_id,
            &spending.name,
            spending.amount,
            &spending.description,
            spending.datetime,
            spending.is_confirm,
            spending.created_at,
            spending.updated_at,
        ),
    )?;

    Ok(())
}

/// Get a page of spending in the order it was recorded.
pub fn query_spendings(
    filter: &SpendingFilter,
    pagination: Pagination,
    connection: &Connection,
) -> Result<Vec<Spending>, Error> {
    let (where_clause, query_parameters) = spending_where_clause(filter);

    let query_string = format!(
        "SELECT id, user_session_id, category, category_id, name, amount, description, datetime,
            is_confirm, created_at, updated_at
        FROM spending
        {where_clause}
        ORDER BY created_at ASC, rowid ASC
        LIMIT {} OFFSET {}",
        pagination.limit,
        pagination.offset()
    );

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), map_row)?
        .map(|maybe_spending| maybe_spending.map_err(|error| error.into()))
        .collect()
}

/// Count the spending matching `filter`.
pub fn count_spendings(filter: &SpendingFilter, connection: &Connection) -> Result<u64, Error> {
    let (where_clause, query_parameters) = spending_where_clause(filter);

    connection
        .query_row(
            &format!("SELECT COUNT(id) FROM spending {where_clause}"),
            params_from_iter(query_parameters.iter()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

fn spending_where_clause(filter: &SpendingFilter) -> (String, Vec<Value>) {
    let mut where_clause_parts = vec![];
    let mut query_parameters = vec![];

    if let Some(owner) = filter.owner {
        where_clause_parts.push(format!("user_session_id = ?{}", query_parameters.len() + 1));
        query_parameters.push(Value::Blob(owner.as_bytes().to_vec()));
    }

    if let Some(search) = &filter.search {
        let param = query_parameters.len() + 1;
        where_clause_parts.push(format!(
            "(name LIKE ?{param} ESCAPE '\\' OR description LIKE ?{param} ESCAPE '\\' \
            OR category LIKE ?{param} ESCAPE '\\')"
        ));
        query_parameters.push(Value::Text(like_pattern(search)));
    }

    if where_clause_parts.is_empty() {
        (String::new(), query_parameters)
    } else {
        (
            String::from("WHERE ") + &where_clause_parts.join(" AND "),
            query_parameters,
        )
    }
}

/// Initialize the spending table and indexes.
///
/// The category table must exist first.
pub fn create_spending_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS spending (
            id BLOB PRIMARY KEY,
            user_session_id BLOB NOT NULL,
            category TEXT NOT NULL,
            category_id BLOB NOT NULL,
            name TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount >= 0),
            description TEXT NOT NULL DEFAULT '',
            datetime TEXT NOT NULL,
            is_confirm INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_spending_owner ON spending(user_session_id);
        CREATE INDEX IF NOT EXISTS idx_spending_created_at ON spending(created_at);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Spending, rusqlite::Error> {
    Ok(Spending {
        id: row.get(0)?,
        user_session_id: row.get(1)?,
        category: row.get(2)?,
        category_id: row.get(3)?,
        name: row.get(4)?,
        amount: row.get(5)?,
        description: row.get(6)?,
        datetime: row.get(7)?,
        is_confirm: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod spending_query_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::datetime};
    use uuid::Uuid;

    use crate::{
        Error,
        category::{create_category_table, get_or_create_category},
        pagination::Pagination,
        spending::{
            Spending,
            db::{
                SpendingFilter, count_spendings, create_spending_table, insert_spending,
                query_spendings,
            },
        },
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        create_spending_table(&connection).expect("Could not create spending table");
        connection
    }

    fn spending(
        owner: Uuid,
        name: &str,
        category: &str,
        created_at: OffsetDateTime,
        connection: &Connection,
    ) -> Spending {
        let category = get_or_create_category(category, created_at, connection).unwrap();

        Spending {
            id: Uuid::new_v4(),
            user_session_id: owner,
            category: category.name,
            category_id: category.id,
            name: name.to_owned(),
            amount: 10.0,
            description: String::new(),
            datetime: created_at,
            is_confirm: true,
            created_at,
            updated_at: created_at,
        }
    }

    fn all() -> Pagination {
        Pagination { page: 1, limit: 50 }
    }

    #[test]
    fn insert_and_query_round_trip() {
        let connection = get_test_connection();
        let want = spending(
            Uuid::new_v4(),
            "lunch",
            "food",
            datetime!(2024-03-15 10:00 UTC),
            &connection,
        );

        insert_spending(&want, &connection).unwrap();

        let got = query_spendings(&SpendingFilter::default(), all(), &connection).unwrap();
        assert_eq!(got, [want]);
    }

    #[test]
    fn duplicate_id_is_conflict() {
        let connection = get_test_connection();
        let record = spending(
            Uuid::new_v4(),
            "lunch",
            "food",
            datetime!(2024-03-15 10:00 UTC),
            &connection,
        );
        insert_spending(&record, &connection).unwrap();

        assert_eq!(insert_spending(&record, &connection), Err(Error::Conflict));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let connection = get_test_connection();
        connection.pragma_update(None, "foreign_keys", true).unwrap();
        let record = Spending {
            category_id: Uuid::new_v4(),
            ..spending(
                Uuid::new_v4(),
                "lunch",
                "food",
                datetime!(2024-03-15 10:00 UTC),
                &connection,
            )
        };

        assert!(insert_spending(&record, &connection).is_err());
    }

    #[test]
    fn lists_in_recorded_order_with_filters() {
        let connection = get_test_connection();
        let owner = Uuid::new_v4();
        let start = datetime!(2024-03-15 10:00 UTC);
        let records = [
            spending(owner, "lunch", "food", start, &connection),
            spending(owner, "bus", "transport", start + Duration::hours(1), &connection),
            spending(
                Uuid::new_v4(),
                "dinner",
                "food",
                start + Duration::hours(2),
                &connection,
            ),
        ];
        // Insert out of order to check the ordering comes from created_at.
        for record in records.iter().rev() {
            insert_spending(record, &connection).unwrap();
        }

        let everything = query_spendings(&SpendingFilter::default(), all(), &connection).unwrap();
        assert_eq!(everything, records);

        let mine = SpendingFilter {
            owner: Some(owner),
            ..Default::default()
        };
        assert_eq!(count_spendings(&mine, &connection), Ok(2));

        let my_food = SpendingFilter {
            owner: Some(owner),
            search: Some("foo".to_owned()),
        };
        let got = query_spendings(&my_food, all(), &connection).unwrap();
        assert_eq!(got, [records[0].clone()]);

        let by_name = SpendingFilter {
            search: Some("din".to_owned()),
            ..Default::default()
        };
        assert_eq!(count_spendings(&by_name, &connection), Ok(1));
    }
}
