//! The spending listing.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    pagination::{PageQuery, PaginationConfig},
    response::SuccessWithPaginate,
    session::SessionHeaders,
    spending::db::{SpendingFilter, count_spendings, query_spendings},
    validation::validate,
};

/// The state needed for the spending listing.
#[derive(Debug, Clone)]
pub struct SpendingListState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for SpendingListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// List spending in the order it was recorded.
///
/// Requests with a `session_user_id` header only see that owner's spending.
pub async fn get_spendings(
    State(state): State<SpendingListState>,
    session: SessionHeaders,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(query) = query?;
    validate(&query)?;
    let pagination = query.pagination(&state.pagination_config);
    let filter = SpendingFilter {
        owner: session.owner()?,
        search: query.search_term().map(str::to_owned),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let spendings = query_spendings(&filter, pagination, &connection)
        .inspect_err(|error| tracing::error!("could not query spending: {error}"))?;
    let total_results = count_spendings(&filter, &connection)?;

    Ok(SuccessWithPaginate::new(
        "Get all spendings successfully",
        spendings,
        pagination.page,
        pagination.limit,
        total_results,
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use time::{Duration, macros::datetime};
    use uuid::Uuid;

    use crate::{
        endpoints,
        response::SuccessWithPaginate,
        session::SESSION_USER_ID_HEADER,
        spending::{
            Spending,
            domain::{CreateSpending, DEFAULT_CATEGORY_ID},
            service::create_spending,
        },
        test_utils::TestApp,
    };

    fn insert(app: &TestApp, owner: Uuid, name: &str, minutes: i64) -> Spending {
        let request = CreateSpending {
            user_session_id: owner.to_string(),
            category: "food".to_owned(),
            category_id: DEFAULT_CATEGORY_ID.to_owned(),
            name: name.to_owned(),
            amount: 1.0,
            description: Some(format!("{name} with friends")),
            datetime: "2024-03-15T10:00:00Z".to_owned(),
            is_confirm: true,
        };
        let now = datetime!(2024-03-15 10:00 UTC) + Duration::minutes(minutes);

        create_spending(&request, now, &app.state.db_connection.lock().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn lists_oldest_first_in_pages() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        let records: Vec<Spending> = (0..3)
            .map(|minutes| insert(&app, owner, &format!("item {minutes}"), minutes))
            .collect();
        let server = app.server();

        let response = server
            .get(endpoints::SPENDING_LIST)
            .add_query_param("page", 2)
            .add_query_param("limit", 2)
            .await;

        response.assert_status_ok();
        let body = response.json::<SuccessWithPaginate<Spending>>();
        assert_eq!(body.results, [records[2].clone()]);
        assert_eq!(body.page, 2);
        assert_eq!(body.total_results, 3);
        assert_eq!(body.total_pages, 2);
    }

    #[tokio::test]
    async fn searches_and_scopes_to_owner() {
        let app = TestApp::new();
        let owner = Uuid::new_v4();
        insert(&app, owner, "lunch", 0);
        insert(&app, owner, "dinner", 1);
        insert(&app, Uuid::new_v4(), "lunch", 2);
        let server = app.server();

        let response = server
            .get(endpoints::SPENDING_LIST)
            .add_query_param("search", "lunch")
            .add_header(SESSION_USER_ID_HEADER, owner.to_string())
            .await;

        response.assert_status_ok();
        let body = response.json::<SuccessWithPaginate<Spending>>();
        assert_eq!(body.total_results, 1);
        assert_eq!(body.results[0].name, "lunch");
        assert_eq!(body.results[0].user_session_id, owner);
    }

    #[tokio::test]
    async fn malformed_owner_is_bad_request() {
        let server = TestApp::new().server();

        let response = server
            .get(endpoints::SPENDING_LIST)
            .add_header(SESSION_USER_ID_HEADER, "12345")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn long_search_is_unprocessable() {
        let server = TestApp::new().server();

        let response = server
            .get(endpoints::SPENDING_LIST)
            .add_query_param("search", "x".repeat(51))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
