//! The category listing.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::db::{count_categories, query_categories},
    pagination::{PageQuery, PaginationConfig},
    response::SuccessWithPaginate,
    validation::validate,
};

/// The state needed for the category listing.
#[derive(Debug, Clone)]
pub struct CategoryListState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for CategoryListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// List the categories, oldest first.
pub async fn get_categories(
    State(state): State<CategoryListState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(query) = query?;
    validate(&query)?;
    let pagination = query.pagination(&state.pagination_config);
    let search = query.search_term();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = query_categories(search, pagination, &connection)
        .inspect_err(|error| tracing::error!("could not query categories: {error}"))?;
    let total_results = count_categories(search, &connection)?;

    Ok(SuccessWithPaginate::new(
        "Successfully retrieved categories",
        categories,
        pagination.page,
        pagination.limit,
        total_results,
    )
    .into_response())
}
