//! Core summary domain types.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The size of the time bucket a summary aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// A calendar day.
    Daily,
    /// Monday to Sunday.
    Weekly,
    /// A calendar month.
    Monthly,
    /// A calendar year.
    Yearly,
}

impl PeriodType {
    /// Every period type, from the smallest bucket to the largest.
    pub const ALL: [PeriodType; 4] = [
        PeriodType::Daily,
        PeriodType::Weekly,
        PeriodType::Monthly,
        PeriodType::Yearly,
    ];

    /// The names accepted by [PeriodType::from_str].
    pub const NAMES: &'static [&'static str] = &["daily", "weekly", "monthly", "yearly"];

    /// The name stored in the database and used in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
            PeriodType::Yearly => "yearly",
        }
    }
}

impl FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(PeriodType::Daily),
            "weekly" => Ok(PeriodType::Weekly),
            "monthly" => Ok(PeriodType::Monthly),
            "yearly" => Ok(PeriodType::Yearly),
            other => Err(format!("unknown period type \"{other}\"")),
        }
    }
}

impl Display for PeriodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for PeriodType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PeriodType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// The start and end (inclusive) of a summary period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl PeriodRange {
    /// Whether `timestamp` falls inside the period.
    pub fn contains(&self, timestamp: OffsetDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// The running total of one owner's spending in one category over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpendingSummary {
    pub id: Uuid,
    pub user_session_id: Uuid,
    pub category_id: Uuid,
    pub category: String,
    /// The total in minor units (cents).
    pub total_amount: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
    pub period_type: PeriodType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The spending of one category aggregated over many summary rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySpending {
    pub category_id: Uuid,
    pub category: String,
    /// The total in minor units (cents).
    pub total_amount: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
    pub period_type: PeriodType,
}

/// An owner's total spending across all categories for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotal {
    pub period_type: PeriodType,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
    /// The total in minor units (cents).
    pub total_amount: i64,
}

/// A request to add a spending amount to the summaries it falls into.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryUpdate {
    pub owner: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    /// The amount in minor units (cents).
    pub amount: i64,
    /// When the spending happened, in any offset.
    pub timestamp: OffsetDateTime,
}

/// Convert an amount in major units (e.g. dollars) to minor units (e.g. cents).
///
/// Returns `None` if the amount is not finite or does not fit in an `i64`.
pub fn to_minor_units(amount: f64) -> Option<i64> {
    let minor_units = (amount * 100.0).round();

    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    (minor_units.is_finite() && minor_units >= i64::MIN as f64 && minor_units < i64::MAX as f64)
        .then_some(minor_units as i64)
}
