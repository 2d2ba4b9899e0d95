//! Applies summary updates on a background task, off the request path.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::OffsetDateTime;
use time_tz::Tz;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use crate::{
    Error,
    summary::{
        domain::SummaryUpdate,
        engine::{SummaryUpdateReport, apply_amount},
    },
};

/// The sending half of the summary update queue.
///
/// Cloning the queue is cheap, all clones feed the same [SummaryWorker].
#[derive(Debug, Clone)]
pub struct SummaryQueue {
    sender: mpsc::Sender<SummaryUpdate>,
}

impl SummaryQueue {
    /// Create a queue holding at most `capacity` pending updates and spawn the
    /// worker that applies them to the database behind `db_connection`, with
    /// periods following the calendar of `timezone`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        capacity: usize,
        db_connection: Arc<Mutex<Connection>>,
        timezone: &'static Tz,
    ) -> (Self, SummaryWorker) {
        let (sender, mut receiver) = mpsc::channel::<SummaryUpdate>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(update) = receiver.recv().await {
                let db_connection = db_connection.clone();
                // The database lock and SQLite calls block.
                let result = tokio::task::spawn_blocking(move || {
                    apply_update(&update, timezone, &db_connection)
                })
                .await;

                if let Err(error) = result {
                    tracing::error!("summary update task failed: {error}");
                }
            }

            tracing::debug!("summary queue closed, summary worker stopping");
        });

        (Self { sender }, SummaryWorker { handle })
    }

    /// Queue `update` without waiting.
    ///
    /// Delivery is best effort: if the queue is full or the worker has
    /// stopped, the update is dropped and a warning is logged. Returns
    /// whether the update was queued.
    pub fn submit(&self, update: SummaryUpdate) -> bool {
        match self.sender.try_send(update) {
            Ok(()) => true,
            Err(TrySendError::Full(update)) => {
                tracing::warn!(
                    "summary queue is full, dropping update for category {}",
                    update.category_id
                );
                false
            }
            Err(TrySendError::Closed(update)) => {
                tracing::warn!(
                    "summary worker has stopped, dropping update for category {}",
                    update.category_id
                );
                false
            }
        }
    }
}

/// The background task that applies queued summary updates.
///
/// The task finishes once every [SummaryQueue] handle has been dropped and the
/// remaining updates have been applied.
#[derive(Debug)]
pub struct SummaryWorker {
    handle: JoinHandle<()>,
}

impl SummaryWorker {
    /// Wait for the worker to apply the remaining updates and stop.
    pub async fn join(self) {
        if let Err(error) = self.handle.await {
            tracing::error!("summary worker did not finish cleanly: {error}");
        }
    }
}

fn apply_update(update: &SummaryUpdate, timezone: &Tz, db_connection: &Mutex<Connection>) {
    let report = match db_connection.lock() {
        Ok(connection) => apply_in_transaction(update, timezone, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return;
        }
    };

    match report {
        Ok(report) if report.is_complete() => {
            tracing::debug!(
                "applied {} to summaries of category {}",
                update.amount,
                update.category_id
            );
        }
        Ok(report) => {
            let failed: Vec<String> = report
                .failed
                .iter()
                .map(|(period_type, error)| format!("{period_type}: {error}"))
                .collect();
            tracing::error!(
                "some summaries of category {} were not updated: {}",
                update.category_id,
                failed.join(", ")
            );
        }
        Err(error) => {
            tracing::error!(
                "could not update summaries of category {}: {error}",
                update.category_id
            );
        }
    }
}

fn apply_in_transaction(
    update: &SummaryUpdate,
    timezone: &Tz,
    connection: &Connection,
) -> Result<SummaryUpdateReport, Error> {
    let transaction = connection.unchecked_transaction()?;
    let report = apply_amount(update, timezone, OffsetDateTime::now_utc(), &transaction);
    transaction.commit()?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use rusqlite::Connection;
    use time::macros::datetime;
    use time_tz::Tz;
    use uuid::Uuid;

    use crate::{
        summary::{db::create_summary_table, domain::SummaryUpdate, worker::SummaryQueue},
        timezone::get_timezone,
    };

    fn utc() -> &'static Tz {
        get_timezone("Etc/UTC").unwrap()
    }

    fn get_test_connection() -> Arc<Mutex<Connection>> {
        let connection = Connection::open_in_memory().unwrap();
        create_summary_table(&connection).expect("Could not create summary table");
        Arc::new(Mutex::new(connection))
    }

    fn update(amount: i64) -> SummaryUpdate {
        SummaryUpdate {
            owner: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            category_name: "food".to_owned(),
            amount,
            timestamp: datetime!(2024-03-15 10:00 UTC),
        }
    }

    fn total_of_all_rows(connection: &Mutex<Connection>) -> i64 {
        connection
            .lock()
            .unwrap()
            .query_row(
                "SELECT COALESCE(SUM(total_amount), 0) FROM category_spending_summary",
                [],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn worker_drains_queue_before_stopping() {
        let connection = get_test_connection();
        let (queue, worker) = SummaryQueue::new(16, connection.clone(), utc());

        for amount in [100, 200, 300] {
            assert!(queue.submit(update(amount)));
        }
        drop(queue);
        worker.join().await;

        // Each update touches the four period types.
        assert_eq!(total_of_all_rows(&connection), 4 * 600);
    }

    #[tokio::test]
    async fn full_queue_drops_updates() {
        let connection = get_test_connection();
        // Hold the lock so the worker cannot make progress.
        let guard = connection.lock().unwrap();
        let (queue, worker) = SummaryQueue::new(1, connection.clone(), utc());

        let accepted = (0..10).filter(|_| queue.submit(update(1))).count();

        assert!(accepted < 10);
        drop(guard);
        drop(queue);
        worker.join().await;
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn waiting_for_the_database_does_not_stall_the_runtime() {
        let connection = get_test_connection();
        let guard = connection.lock().unwrap();
        let (queue, worker) = SummaryQueue::new(4, connection.clone(), utc());
        assert!(queue.submit(update(100)));

        // Give the worker a chance to pick up the update and wait on the lock.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(guard);
        drop(queue);
        worker.join().await;
        assert_eq!(total_of_all_rows(&connection), 4 * 100);
    }
}
