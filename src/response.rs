//! The JSON envelopes that every endpoint responds with.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::validation::FieldViolation;

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";

/// A successful response carrying a single value.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SuccessWithData<T> {
    pub code: u16,
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> SuccessWithData<T> {
    pub fn new(code: StatusCode, message: &str, data: T) -> Self {
        Self {
            code: code.as_u16(),
            status: STATUS_SUCCESS.to_owned(),
            message: message.to_owned(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessWithData<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);

        (status, Json(self)).into_response()
    }
}

/// A successful response carrying one page of results.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SuccessWithPaginate<T> {
    pub code: u16,
    pub status: String,
    pub message: String,
    pub results: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_results: u64,
}

impl<T: Serialize> SuccessWithPaginate<T> {
    pub fn new(message: &str, results: Vec<T>, page: u64, limit: u64, total_results: u64) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            status: STATUS_SUCCESS.to_owned(),
            message: message.to_owned(),
            results,
            page,
            limit,
            total_pages: total_results.div_ceil(limit.max(1)),
            total_results,
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessWithPaginate<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// The body of every error response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: u16,
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldViolation>,
}

impl ErrorBody {
    pub fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code: code.as_u16(),
            status: STATUS_ERROR.to_owned(),
            message: message.to_owned(),
            errors: Vec::new(),
        }
    }

    pub fn with_violations(mut self, violations: Vec<FieldViolation>) -> Self {
        self.errors = violations;
        self
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(self)).into_response()
    }
}
