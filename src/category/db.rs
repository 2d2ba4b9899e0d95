//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row, params_from_iter, types::Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    category::Category,
    pagination::{Pagination, like_pattern},
};

const SELECT_CATEGORY: &str = "SELECT id, name, is_active, created_at, updated_at FROM category";

/// Get the category called `name`, creating it if it does not exist yet.
///
/// If several categories share the name, the oldest one is returned.
pub fn get_or_create_category(
    name: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Category, Error> {
    let existing = connection
        .prepare(&format!(
            "{SELECT_CATEGORY} WHERE name = ?1 ORDER BY created_at ASC, rowid ASC LIMIT 1"
        ))?
        .query_row([name], map_row)
        .optional()?;

    if let Some(category) = existing {
        return Ok(category);
    }

    let category = Category {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    connection.execute(
        "INSERT INTO category (id, name, is_active, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            category.id,
            &category.name,
            category.is_active,
            category.created_at,
            category.updated_at,
        ),
    )?;

    tracing::info!("created category \"{}\" ({})", category.name, category.id);

    Ok(category)
}

/// Get a page of categories, oldest first.
///
/// `search` restricts the results to names containing it.
pub fn query_categories(
    search: Option<&str>,
    pagination: Pagination,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let mut query_string_parts = vec![SELECT_CATEGORY.to_owned()];
    let mut query_parameters = vec![];

    if let Some(search) = search {
        query_string_parts.push("WHERE name LIKE ?1 ESCAPE '\\'".to_owned());
        query_parameters.push(Value::Text(like_pattern(search)));
    }

    query_string_parts.push("ORDER BY created_at ASC, rowid ASC".to_owned());
    query_string_parts.push(format!(
        "LIMIT {} OFFSET {}",
        pagination.limit,
        pagination.offset()
    ));

    connection
        .prepare(&query_string_parts.join(" "))?
        .query_map(params_from_iter(query_parameters.iter()), map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Count the categories matching `search`.
pub fn count_categories(search: Option<&str>, connection: &Connection) -> Result<u64, Error> {
    let count = match search {
        Some(search) => connection.query_row(
            "SELECT COUNT(id) FROM category WHERE name LIKE ?1 ESCAPE '\\'",
            [like_pattern(search)],
            |row| row.get(0),
        )?,
        None => connection.query_row("SELECT COUNT(id) FROM category", [], |row| row.get(0))?,
    };

    Ok(count)
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id BLOB PRIMARY KEY,
            name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;
    use time::{Duration, macros::datetime};

    use crate::{
        category::db::{
            count_categories, create_category_table, get_or_create_category, query_categories,
        },
        pagination::Pagination,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    fn all() -> Pagination {
        Pagination { page: 1, limit: 50 }
    }

    #[test]
    fn creates_missing_category() {
        let connection = get_test_connection();
        let now = datetime!(2024-03-15 10:00 UTC);

        let category = get_or_create_category("food", now, &connection).unwrap();

        assert_eq!(category.name, "food");
        assert!(category.is_active);
        assert_eq!(category.created_at, now);
        assert_eq!(query_categories(None, all(), &connection), Ok(vec![category]));
    }

    #[test]
    fn reuses_existing_category() {
        let connection = get_test_connection();
        let now = datetime!(2024-03-15 10:00 UTC);
        let first = get_or_create_category("food", now, &connection).unwrap();

        let second =
            get_or_create_category("food", now + Duration::minutes(5), &connection).unwrap();

        assert_eq!(first, second);
        assert_eq!(count_categories(None, &connection), Ok(1));
    }

    #[test]
    fn lists_oldest_first() {
        let connection = get_test_connection();
        let now = datetime!(2024-03-15 10:00 UTC);
        get_or_create_category("rent", now + Duration::hours(1), &connection).unwrap();
        get_or_create_category("food", now, &connection).unwrap();

        let names: Vec<String> = query_categories(None, all(), &connection)
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();

        assert_eq!(names, ["food", "rent"]);
    }

    #[test]
    fn search_matches_substrings() {
        let connection = get_test_connection();
        let now = datetime!(2024-03-15 10:00 UTC);
        for name in ["food", "fast food", "fuel", "100% juice"] {
            get_or_create_category(name, now, &connection).unwrap();
        }

        let food = query_categories(Some("food"), all(), &connection).unwrap();
        let percent = query_categories(Some("%"), all(), &connection).unwrap();

        assert_eq!(food.len(), 2);
        assert_eq!(count_categories(Some("food"), &connection), Ok(2));
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].name, "100% juice");
    }

    #[test]
    fn pages_through_categories() {
        let connection = get_test_connection();
        let now = datetime!(2024-03-15 10:00 UTC);
        for minute in 0..5 {
            get_or_create_category(
                &format!("category {minute}"),
                now + Duration::minutes(minute),
                &connection,
            )
            .unwrap();
        }

        let page = query_categories(None, Pagination { page: 3, limit: 2 }, &connection).unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "category 4");
    }
}
