//! The `{error}` envelope and its mapping from query failures.

use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use campaignfinance_lib::QueryError;
use serde::Serialize;
use tracing::{error, warn};

use crate::config::Mode;

pub const GENERIC_MESSAGE: &str = "unable to process request";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A failed request, ready to be rendered as `{error: string}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Map a query failure. Client mistakes become 400 with their message;
    /// everything else is logged and becomes a 500.
    pub fn from_query(err: QueryError, mode: Mode) -> Self {
        match err {
            QueryError::InvalidInput(msg) => Self::rejected(StatusCode::BAD_REQUEST, msg),
            QueryError::Store(e) => Self::internal(e, mode),
        }
    }

    /// A request turned away before any query ran, e.g. an undecodable
    /// path segment. Client errors keep their status.
    pub fn rejected(status: StatusCode, reason: impl Display) -> Self {
        warn!(%status, reason = %reason, "rejected request");
        Self {
            status,
            message: format!("invalid request: {}", reason),
        }
    }

    /// A 500 whose detail is only shown in development mode.
    pub fn internal(cause: impl Display, mode: Mode) -> Self {
        error!(error = %cause, "request failed");
        let message = if mode.exposes_detail() {
            format!("{}: {}", GENERIC_MESSAGE, cause)
        } else {
            GENERIC_MESSAGE.to_string()
        };
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "not found".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
