//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time_tz::Tz;

use crate::{
    Error,
    db::initialize,
    pagination::PaginationConfig,
    summary::{SummaryQueue, SummaryWorker},
    timezone::get_timezone,
    webhook::SpendingParser,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone, e.g. "Pacific/Auckland".
    ///
    /// Summary periods follow the calendar of this timezone.
    pub local_timezone: &'static Tz,

    /// The config that controls how to page through lists.
    pub pagination_config: PaginationConfig,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Where new spending is sent to be added to the summaries.
    pub summary_queue: SummaryQueue,

    /// Extracts the category, amount and item name from submitted spending.
    pub spending_parser: Arc<dyn SpendingParser>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models
    /// and spawn the summary worker, so it must be called from within a tokio runtime.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// The returned [SummaryWorker] stops once every clone of the state has been
    /// dropped, await [SummaryWorker::join] to let it finish pending updates.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the timezone is unknown.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        pagination_config: PaginationConfig,
        summary_queue_capacity: usize,
        spending_parser: Arc<dyn SpendingParser>,
    ) -> Result<(Self, SummaryWorker), Error> {
        let local_timezone = get_timezone(local_timezone)?;

        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let (summary_queue, summary_worker) =
            SummaryQueue::new(summary_queue_capacity, connection.clone(), local_timezone);

        let state = Self {
            local_timezone,
            pagination_config,
            db_connection: connection,
            summary_queue,
            spending_parser,
        };

        Ok((state, summary_worker))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rusqlite::Connection;

    use crate::{AppState, Error, PaginationConfig, test_utils::StubParser};

    #[tokio::test]
    async fn rejects_unknown_timezone() {
        let result = AppState::new(
            Connection::open_in_memory().unwrap(),
            "Not/AZone",
            PaginationConfig::default(),
            8,
            Arc::new(StubParser::default()),
        );

        assert_eq!(
            result.map(|_| ()),
            Err(Error::InvalidTimezoneError("Not/AZone".to_owned()))
        );
    }

    #[tokio::test]
    async fn creates_tables() {
        let (state, worker) = AppState::new(
            Connection::open_in_memory().unwrap(),
            "Etc/UTC",
            PaginationConfig::default(),
            8,
            Arc::new(StubParser::default()),
        )
        .unwrap();

        let table_count: i64 = state
            .db_connection
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                AND name IN ('category', 'spending', 'category_spending_summary')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 3);

        drop(state);
        worker.join().await;
    }
}
