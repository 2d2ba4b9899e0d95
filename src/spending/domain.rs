//! Core spending domain types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::validation::{Constraint, Field, Validate};

/// The category ID given to spending created from webhook replies.
///
/// The stored category is always resolved by name, this ID is only a hint.
pub const DEFAULT_CATEGORY_ID: &str = "95eb84d2-0a32-4aef-b6c2-bfb5bbc686f5";

/// The largest amount a single spending may have, in major units.
///
/// Keeps the summary totals, which are summed in minor units, far from `i64::MAX`.
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// A recorded spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spending {
    pub id: Uuid,
    pub user_session_id: Uuid,
    pub category: String,
    pub category_id: Uuid,
    pub name: String,
    /// The amount in major units, e.g. dollars.
    pub amount: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// When the money was spent.
    #[serde(with = "time::serde::rfc3339")]
    pub datetime: OffsetDateTime,
    pub is_confirm: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

const OWNER_CONSTRAINTS: &[Constraint] = &[Constraint::Required, Constraint::MaxChars(50)];
const CATEGORY_CONSTRAINTS: &[Constraint] = &[Constraint::Required, Constraint::MaxChars(50)];
const CATEGORY_ID_CONSTRAINTS: &[Constraint] = &[Constraint::Required, Constraint::Uuid];
const NAME_CONSTRAINTS: &[Constraint] = &[Constraint::Required, Constraint::MaxChars(50)];
const AMOUNT_CONSTRAINTS: &[Constraint] = &[Constraint::Min(0.0), Constraint::Max(MAX_AMOUNT)];
const DESCRIPTION_CONSTRAINTS: &[Constraint] = &[Constraint::MaxChars(200)];
const DATETIME_CONSTRAINTS: &[Constraint] = &[Constraint::Required, Constraint::Rfc3339];

/// A request to record a spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSpending {
    pub user_session_id: String,
    pub category: String,
    pub category_id: String,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    /// An RFC 3339 date-time, e.g. "2024-03-15T10:00:00Z".
    pub datetime: String,
    #[serde(default)]
    pub is_confirm: bool,
}

impl Validate for CreateSpending {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::text("user_session_id", &self.user_session_id, OWNER_CONSTRAINTS),
            Field::text("category", &self.category, CATEGORY_CONSTRAINTS),
            Field::text("category_id", &self.category_id, CATEGORY_ID_CONSTRAINTS),
            Field::text("name", &self.name, NAME_CONSTRAINTS),
            Field::number("amount", self.amount, AMOUNT_CONSTRAINTS),
            Field::optional_text(
                "description",
                self.description.as_deref(),
                DESCRIPTION_CONSTRAINTS,
            ),
            Field::text("datetime", &self.datetime, DATETIME_CONSTRAINTS),
        ]
    }
}
