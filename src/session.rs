//! The session headers that identify who a request is for.
//!
//! Sessions are not authenticated here. The headers are opaque values that
//! scope queries to an owner and are forwarded to the categorization webhook.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::Error;

/// The header carrying the user session ID.
pub const SESSION_USER_ID_HEADER: &str = "session_user_id";

/// The session headers of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHeaders {
    /// The raw `session_user_id` header.
    pub session_user_id: Option<String>,
    /// The raw `Authorization` header.
    pub authorization: Option<String>,
}

impl SessionHeaders {
    /// Read the session headers from `headers`.
    ///
    /// Blank headers are treated as missing.
    ///
    /// # Errors
    /// Returns [Error::InvalidOwnerId] if the session header is not valid text.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Error> {
        let session_user_id = match headers.get(SESSION_USER_ID_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| {
                        Error::InvalidOwnerId(String::from_utf8_lossy(value.as_bytes()).into())
                    })?
                    .trim()
                    .to_owned(),
            ),
            None => None,
        }
        .filter(|value| !value.is_empty());

        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            session_user_id,
            authorization,
        })
    }

    /// The owner the request is scoped to, if the session header is present.
    ///
    /// # Errors
    /// Returns [Error::InvalidOwnerId] if the header is not a UUID.
    pub fn owner(&self) -> Result<Option<Uuid>, Error> {
        self.session_user_id.as_deref().map(parse_owner_id).transpose()
    }

    /// The owner the request is scoped to.
    ///
    /// # Errors
    /// Returns [Error::MissingOwnerId] if the session header is missing, or
    /// [Error::InvalidOwnerId] if it is not a UUID.
    pub fn require_owner(&self) -> Result<Uuid, Error> {
        self.owner()?.ok_or(Error::MissingOwnerId)
    }
}

impl<S> FromRequestParts<S> for SessionHeaders
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        SessionHeaders::from_headers(&parts.headers)
    }
}

/// Parse a user session ID.
///
/// # Errors
/// Returns [Error::InvalidOwnerId] if `raw` is not a UUID.
pub fn parse_owner_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::InvalidOwnerId(raw.to_owned()))
}
