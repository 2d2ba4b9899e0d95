//! Database operations for spending summaries.

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    Error,
    pagination::{Pagination, like_pattern},
    summary::domain::{CategorySpendingSummary, PeriodRange, PeriodType, SummarySpending},
};

/// Identifies exactly one summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryKey {
    pub owner: Uuid,
    pub category_id: Uuid,
    pub range: PeriodRange,
    pub period_type: PeriodType,
}

/// Restricts which daily summaries are aggregated by [query_summary_spending].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    pub owner: Uuid,
    /// Only categories whose name contains this string.
    pub search: Option<String>,
    /// Only days starting at or after this instant.
    pub period_start: Option<OffsetDateTime>,
    /// Only days ending at or before this instant.
    pub period_end: Option<OffsetDateTime>,
}

/// Retrieve the summary row for `key`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such row.
pub fn get_summary(
    key: &SummaryKey,
    connection: &Connection,
) -> Result<CategorySpendingSummary, Error> {
    connection
        .prepare(
            "SELECT id, user_session_id, category_id, category, total_amount, period_start,
                period_end, period_type, created_at, updated_at
            FROM category_spending_summary
            WHERE user_session_id = ?1 AND category_id = ?2 AND period_start = ?3
                AND period_end = ?4 AND period_type = ?5",
        )?
        .query_row(
            (
                key.owner,
                key.category_id,
                key.range.start,
                key.range.end,
                key.period_type,
            ),
            map_summary_row,
        )
        .map_err(|error| error.into())
}

/// Insert a summary row for `key` starting at `amount`.
///
/// If another writer created the row first, `amount` is added to its total
/// instead.
pub fn insert_summary(
    key: &SummaryKey,
    category_name: &str,
    amount: i64,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO category_spending_summary (id, user_session_id, category_id, category,
            total_amount, period_start, period_end, period_type, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        ON CONFLICT (user_session_id, category_id, period_start, period_end, period_type)
        DO UPDATE SET total_amount = total_amount + excluded.total_amount,
            updated_at = excluded.updated_at",
        (
            Uuid::new_v4(),
            key.owner,
            key.category_id,
            category_name,
            amount,
            key.range.start,
            key.range.end,
            key.period_type,
            now,
        ),
    )?;

    Ok(())
}

/// Add `amount` to the total of the summary row `id`.
///
/// The addition happens in SQL so concurrent increments are never lost.
///
/// # Errors
/// Returns [Error::NotFound] if the row does not exist.
pub fn increment_summary(
    id: Uuid,
    amount: i64,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category_spending_summary
        SET total_amount = total_amount + ?1, updated_at = ?2
        WHERE id = ?3",
        (amount, now, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Aggregate the owner's daily summaries per category, largest total first.
///
/// Ties are broken by category name, then category ID, so paging is stable.
pub fn query_summary_spending(
    filter: &SummaryFilter,
    pagination: Pagination,
    connection: &Connection,
) -> Result<Vec<SummarySpending>, Error> {
    let (where_clause, query_parameters) = summary_where_clause(filter);

    let query_string = format!(
        "SELECT category_id, category, SUM(total_amount) AS total, MIN(period_start),
            MAX(period_end)
        FROM category_spending_summary
        {where_clause}
        GROUP BY category_id
        ORDER BY total DESC, category ASC, category_id ASC
        LIMIT {} OFFSET {}",
        pagination.limit,
        pagination.offset()
    );

    connection
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), |row| {
            Ok(SummarySpending {
                category_id: row.get(0)?,
                category: row.get(1)?,
                total_amount: row.get(2)?,
                period_start: row.get(3)?,
                period_end: row.get(4)?,
                period_type: PeriodType::Daily,
            })
        })?
        .map(|maybe_summary| maybe_summary.map_err(|error| error.into()))
        .collect()
}

/// Count the categories that [query_summary_spending] would return over all pages.
pub fn count_summary_categories(
    filter: &SummaryFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    let (where_clause, query_parameters) = summary_where_clause(filter);

    connection
        .query_row(
            &format!(
                "SELECT COUNT(DISTINCT category_id) FROM category_spending_summary {where_clause}"
            ),
            params_from_iter(query_parameters.iter()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Sum the owner's `period_type` summaries whose period contains `at`.
pub fn get_total_at(
    owner: Uuid,
    period_type: PeriodType,
    at: OffsetDateTime,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(total_amount), 0) FROM category_spending_summary
            WHERE user_session_id = ?1 AND period_type = ?2
                AND julianday(period_start) <= julianday(?3)
                AND julianday(?3) <= julianday(period_end)",
            (owner, period_type, at),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Build the WHERE clause shared by the aggregation and its count.
///
/// Period bounds are compared with `julianday` since stored timestamps may
/// carry different UTC offsets.
fn summary_where_clause(filter: &SummaryFilter) -> (String, Vec<Value>) {
    let mut where_clause_parts = vec![
        "user_session_id = ?1".to_owned(),
        "period_type = ?2".to_owned(),
    ];
    let mut query_parameters = vec![
        Value::Blob(filter.owner.as_bytes().to_vec()),
        Value::Text(PeriodType::Daily.as_str().to_owned()),
    ];

    if let Some(search) = &filter.search {
        where_clause_parts.push(format!(
            "category LIKE ?{} ESCAPE '\\'",
            query_parameters.len() + 1
        ));
        query_parameters.push(Value::Text(like_pattern(search)));
    }

    if let Some(period_start) = filter.period_start {
        where_clause_parts.push(format!(
            "julianday(period_start) >= julianday(?{})",
            query_parameters.len() + 1
        ));
        query_parameters.push(Value::Text(to_sql_text(period_start)));
    }

    if let Some(period_end) = filter.period_end {
        where_clause_parts.push(format!(
            "julianday(period_end) <= julianday(?{})",
            query_parameters.len() + 1
        ));
        query_parameters.push(Value::Text(to_sql_text(period_end)));
    }

    (
        String::from("WHERE ") + &where_clause_parts.join(" AND "),
        query_parameters,
    )
}

/// Format a timestamp the way SQLite date functions expect it.
fn to_sql_text(timestamp: OffsetDateTime) -> String {
    let utc = timestamp.to_offset(time::UtcOffset::UTC);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second(),
        utc.millisecond()
    )
}

/// Initialize the summary table and indexes.
pub fn create_summary_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category_spending_summary (
            id BLOB PRIMARY KEY,
            user_session_id BLOB NOT NULL,
            category_id BLOB NOT NULL,
            category TEXT NOT NULL,
            total_amount INTEGER NOT NULL DEFAULT 0
                CHECK (typeof(total_amount) = 'integer'),
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            period_type TEXT NOT NULL
                CHECK (period_type IN ('daily', 'weekly', 'monthly', 'yearly')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_session_id, category_id, period_start, period_end, period_type)
        );

        CREATE INDEX IF NOT EXISTS idx_summary_owner_period_type
            ON category_spending_summary(user_session_id, period_type);",
    )?;

    Ok(())
}

fn map_summary_row(row: &Row) -> Result<CategorySpendingSummary, rusqlite::Error> {
    Ok(CategorySpendingSummary {
        id: row.get(0)?,
        user_session_id: row.get(1)?,
        category_id: row.get(2)?,
        category: row.get(3)?,
        total_amount: row.get(4)?,
        period_start: row.get(5)?,
        period_end: row.get(6)?,
        period_type: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
