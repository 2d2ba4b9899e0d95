//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::response::ErrorBody;

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Multipart request bodies are passed through without being read and the
/// `Authorization` header is never logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();

    let request = if is_multipart(&parts.headers) {
        tracing::info!(
            "Received request: {} {}\nheaders: {:#?}\nbody: <multipart form, {} bytes>",
            parts.method,
            parts.uri,
            redacted_headers(&parts.headers),
            content_length(&parts.headers).unwrap_or("unknown"),
        );
        Request::from_parts(parts, body)
    } else {
        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(body) => body,
            Err(error) => {
                tracing::error!("could not read request body: {error}");
                return ErrorBody::new(StatusCode::BAD_REQUEST, "Could not read request body")
                    .into_response();
            }
        };

        log_body(
            &format!(
                "Received request: {} {}\nheaders: {:#?}",
                parts.method,
                parts.uri,
                redacted_headers(&parts.headers)
            ),
            &body,
        );
        Request::from_parts(parts, Body::from(body))
    };

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return ErrorBody::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred, check the server logs for more details.",
            )
            .into_response();
        }
    };

    log_body(
        &format!(
            "Sending response: {}\nheaders: {:#?}",
            parts.status,
            redacted_headers(&parts.headers)
        ),
        &body,
    );

    Response::from_parts(parts, Body::from(body))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/"))
}

fn content_length(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
}

fn redacted_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    if headers.contains_key(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, HeaderValue::from_static(REDACTED));
    }

    headers
}

fn log_body(message: &str, body: &Bytes) {
    let body = String::from_utf8_lossy(body);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("{message}\nbody: {}...", truncate(&body, LOG_BODY_LENGTH_LIMIT));
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{message}\nbody: {body:?}");
    }
}

/// The longest prefix of `text` that is at most `limit` bytes and ends on a char boundary.
fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }

    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}
