//! The per-category spending summary listing.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    AppState, Error,
    pagination::{PageQuery, PaginationConfig, page_fields},
    response::SuccessWithPaginate,
    session::SessionHeaders,
    summary::db::{SummaryFilter, count_summary_categories, query_summary_spending},
    validation::{Constraint, Field, Validate, validate},
};

/// The state needed for the summary listing.
#[derive(Debug, Clone)]
pub struct SummaryListState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for SummaryListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters of the summary listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    /// Only include days starting at or after this RFC 3339 date-time.
    pub period_start: Option<String>,
    /// Only include days ending at or before this RFC 3339 date-time.
    pub period_end: Option<String>,
}

impl Validate for SummaryQuery {
    fn fields(&self) -> Vec<Field<'_>> {
        let mut fields = page_fields(self.page, self.limit, self.search.as_deref());
        fields.push(Field::optional_text(
            "period_start",
            self.period_start.as_deref(),
            &[Constraint::Rfc3339],
        ));
        fields.push(Field::optional_text(
            "period_end",
            self.period_end.as_deref(),
            &[Constraint::Rfc3339],
        ));
        fields
    }
}

/// List the requesting owner's spending per category, largest total first.
///
/// Totals are aggregated from the daily summaries, so the reported period
/// spans the first to the last day with spending in that category.
pub async fn get_summary_spending(
    State(state): State<SummaryListState>,
    session: SessionHeaders,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(query) = query?;
    validate(&query)?;
    let owner = session.require_owner()?;

    let page_query = PageQuery {
        page: query.page,
        limit: query.limit,
        search: query.search.clone(),
    };
    let pagination = page_query.pagination(&state.pagination_config);
    let filter = SummaryFilter {
        owner,
        search: page_query.search_term().map(str::to_owned),
        period_start: parse_optional_timestamp(query.period_start.as_deref())?,
        period_end: parse_optional_timestamp(query.period_end.as_deref())?,
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let summaries = query_summary_spending(&filter, pagination, &connection)
        .inspect_err(|error| tracing::error!("could not query spending summary: {error}"))?;
    let total_results = count_summary_categories(&filter, &connection)?;

    Ok(SuccessWithPaginate::new(
        "Successfully retrieved spending summary",
        summaries,
        pagination.page,
        pagination.limit,
        total_results,
    )
    .into_response())
}

fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<OffsetDateTime>, Error> {
    raw.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            OffsetDateTime::parse(raw, &Rfc3339)
                .map_err(|error| Error::InvalidQuery(format!("invalid date-time \"{raw}\": {error}")))
        })
        .transpose()
}
