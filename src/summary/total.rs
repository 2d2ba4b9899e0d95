//! The owner's total spending for the current period.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;
use time_tz::Tz;

use crate::{
    AppState, Error,
    response::SuccessWithData,
    session::SessionHeaders,
    summary::{
        db::get_total_at,
        domain::{PeriodType, SummaryTotal},
        period::period_range,
    },
    validation::{Constraint, Field, Validate, validate},
};

/// The state needed for the summary total.
#[derive(Debug, Clone)]
pub struct SummaryTotalState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone whose calendar defines the current period.
    pub local_timezone: &'static Tz,
}

impl FromRef<AppState> for SummaryTotalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone,
        }
    }
}

const PERIOD_TYPE_CONSTRAINTS: &[Constraint] = &[Constraint::OneOf(PeriodType::NAMES)];

/// The query parameters of the summary total.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryTotalQuery {
    /// One of daily, weekly, monthly or yearly. Defaults to monthly.
    pub period_type: Option<String>,
}

impl Validate for SummaryTotalQuery {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![Field::optional_text(
            "period_type",
            self.period_type.as_deref(),
            PERIOD_TYPE_CONSTRAINTS,
        )]
    }
}

/// Get the requesting owner's total spending for the period that contains now.
pub async fn get_summary_total(
    State(state): State<SummaryTotalState>,
    session: SessionHeaders,
    query: Result<Query<SummaryTotalQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(query) = query?;
    validate(&query)?;
    let owner = session.require_owner()?;

    let period_type = match query.period_type.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.parse().map_err(Error::InvalidQuery)?,
        _ => PeriodType::Monthly,
    };
    let now = OffsetDateTime::now_utc();
    let range = period_range(period_type, now, state.local_timezone);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let total_amount = get_total_at(owner, period_type, now, &connection)
        .inspect_err(|error| tracing::error!("could not get {period_type} total: {error}"))?;

    let total = SummaryTotal {
        period_type,
        period_start: range.start,
        period_end: range.end,
        total_amount,
    };

    Ok(SuccessWithData::new(StatusCode::OK, "Successfully retrieved spending total", total)
        .into_response())
}
