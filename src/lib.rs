//! Spendwise is a small backend for tracking personal spending.
//!
//! Spending entries arrive as free text or a receipt file, are sent to an
//! external categorization webhook, stored in SQLite and rolled up into
//! daily, weekly, monthly and yearly totals per category.
//!
//! This library provides the JSON REST API, the summary engine and the
//! background worker that keeps the summaries up to date.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod category;
mod db;
mod endpoints;
mod logging;
mod pagination;
mod response;
mod routing;
mod session;
mod spending;
mod summary;
mod timezone;
mod validation;
mod webhook;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use summary::{PeriodType, SummaryQueue, SummaryWorker};
pub use webhook::{SpendingParser, WebhookParser};

use crate::{response::ErrorBody, validation::ValidationErrors};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more fields of a request failed validation.
    #[error("invalid request: {0}")]
    Validation(ValidationErrors),

    /// The user session ID is not a valid UUID.
    #[error("invalid user session id format: \"{0}\"")]
    InvalidOwnerId(String),

    /// The request has no `session_user_id` header but the endpoint needs one.
    #[error("the session_user_id header is required")]
    MissingOwnerId,

    /// The multipart form could not be read.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form had neither a `file` part nor a `text` field.
    #[error("either text or file must be provided")]
    MissingSpendingInput,

    /// A query string parameter could not be interpreted.
    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),

    /// A record with the same key already exists.
    ///
    /// This comes from a UNIQUE or PRIMARY KEY constraint failing in the
    /// database.
    #[error("the record already exists")]
    Conflict,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The request to the categorization webhook could not be built.
    ///
    /// Transport failures do not use this error, those degrade to an empty
    /// parse result instead.
    #[error("could not prepare the webhook request: {0}")]
    WebhookError(String),

    /// A timestamp could not be formatted.
    #[error("could not format timestamp: {0}")]
    TimestampFormat(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code:
                        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY,
                },
                _,
            ) => Error::Conflict,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(value: QueryRejection) -> Self {
        Error::InvalidQuery(value.body_text())
    }
}

impl From<MultipartRejection> for Error {
    fn from(value: MultipartRejection) -> Self {
        Error::MultipartError(value.body_text())
    }
}

impl From<MultipartError> for Error {
    fn from(value: MultipartError) -> Self {
        Error::MultipartError(value.body_text())
    }
}

impl From<ValidationErrors> for Error {
    fn from(value: ValidationErrors) -> Self {
        Error::Validation(value)
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidOwnerId(_)
            | Error::MissingOwnerId
            | Error::MultipartError(_)
            | Error::MissingSpendingInput
            | Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::Conflict => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::WebhookError(_)
            | Error::TimestampFormat(_)
            | Error::InvalidTimezoneError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Error::Validation(errors) => {
                ErrorBody::new(status, "Invalid request").with_violations(errors.into_inner())
            }
            Error::InvalidOwnerId(_) => ErrorBody::new(status, "Invalid user session id format"),
            Error::Conflict => ErrorBody::new(status, "Spending record already exists"),
            error @ (Error::MissingOwnerId
            | Error::MultipartError(_)
            | Error::MissingSpendingInput
            | Error::InvalidQuery(_)
            | Error::NotFound) => ErrorBody::new(status, &error.to_string()),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                ErrorBody::new(
                    status,
                    "An unexpected error occurred, check the server logs for more details.",
                )
            }
        };

        body.into_response()
    }
}
