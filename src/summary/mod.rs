//! Running spending totals per owner, category and calendar period.
//!
//! Every new spending is added to four overlapping summaries: the day, the
//! Monday to Sunday week, the month and the year it happened in. Updates are
//! applied by a background worker fed through [SummaryQueue].

mod db;
mod domain;
mod engine;
mod list;
mod period;
mod total;
mod worker;

pub use db::create_summary_table;
pub use domain::{PeriodType, SummaryUpdate, to_minor_units};
#[cfg(test)]
pub use engine::apply_amount;
pub use list::get_summary_spending;
pub use total::get_summary_total;
pub use worker::{SummaryQueue, SummaryWorker};
