//! Application router configuration.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    AppState,
    category::get_categories,
    endpoints,
    logging::logging_middleware,
    response::ErrorBody,
    spending::{create_spending_endpoint, get_spendings},
    summary::{get_summary_spending, get_summary_total},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::SPENDING, post(create_spending_endpoint))
        .route(endpoints::SPENDING_LIST, get(get_spendings))
        .route(endpoints::CATEGORIES, get(get_categories))
        .route(endpoints::SUMMARY, get(get_summary_spending))
        .route(endpoints::SUMMARY_TOTAL, get(get_summary_total))
        .route(endpoints::COFFEE, get(get_coffee))
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    ErrorBody::new(StatusCode::IM_A_TEAPOT, "I'm a teapot").into_response()
}

async fn get_404_not_found() -> Response {
    ErrorBody::new(StatusCode::NOT_FOUND, "Route not found").into_response()
}
