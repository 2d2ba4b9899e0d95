//! Applies spending amounts to the summaries of every period type.

use rusqlite::Connection;
use time::OffsetDateTime;
use time_tz::Tz;

use crate::{
    Error,
    summary::{
        db::{SummaryKey, get_summary, increment_summary, insert_summary},
        domain::{PeriodType, SummaryUpdate},
        period::period_range,
    },
};

/// The outcome of applying one [SummaryUpdate].
#[derive(Debug, Default, PartialEq)]
pub struct SummaryUpdateReport {
    /// The period types whose summary was created or incremented.
    pub updated: Vec<PeriodType>,
    /// The period types that could not be updated, with the reason.
    pub failed: Vec<(PeriodType, Error)>,
}

impl SummaryUpdateReport {
    /// Whether every period type was updated.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Add the amount of `update` to its daily, weekly, monthly and yearly summaries.
///
/// Periods follow the calendar of `timezone`. A missing summary row is
/// created with the amount as its total, an existing one is incremented in
/// place. A failure for one period type does not stop the others, the report
/// lists what failed.
pub fn apply_amount(
    update: &SummaryUpdate,
    timezone: &Tz,
    now: OffsetDateTime,
    connection: &Connection,
) -> SummaryUpdateReport {
    let mut report = SummaryUpdateReport::default();

    for period_type in PeriodType::ALL {
        let key = SummaryKey {
            owner: update.owner,
            category_id: update.category_id,
            range: period_range(period_type, update.timestamp, timezone),
            period_type,
        };

        match upsert_summary(&key, update, now, connection) {
            Ok(()) => report.updated.push(period_type),
            Err(error) => {
                tracing::error!(
                    "could not update {period_type} summary for category {}: {error}",
                    update.category_id
                );
                report.failed.push((period_type, error));
            }
        }
    }

    report
}

fn upsert_summary(
    key: &SummaryKey,
    update: &SummaryUpdate,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    match get_summary(key, connection) {
        Ok(summary) => increment_summary(summary.id, update.amount, now, connection),
        Err(Error::NotFound) => {
            insert_summary(key, &update.category_name, update.amount, now, connection)
        }
        Err(error) => Err(error),
    }
}
