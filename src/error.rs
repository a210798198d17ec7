// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => Self::not_found(format!("not found: {path}")),
            StoreError::AlreadyExists(path) => {
                Self::conflict(format!("already exists: {path}"))
            }
            StoreError::VersionConflict { path, .. } => {
                Self::conflict(format!("concurrent modification of {path}, retry"))
            }
            other => {
                error!(%other, "store operation failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let conflict = ApiError::conflict("taken");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.message, "taken");
    }

    #[test]
    fn store_errors_map_to_http_statuses() {
        let nf: ApiError = StoreError::NotFound("clients/x/data.json".into()).into();
        assert_eq!(nf.status, StatusCode::NOT_FOUND);

        let exists: ApiError = StoreError::AlreadyExists("clients/data.json".into()).into();
        assert_eq!(exists.status, StatusCode::CONFLICT);

        let stale: ApiError = StoreError::VersionConflict {
            path: "clients/data.json".into(),
            expected: "abc".into(),
        }
        .into();
        assert_eq!(stale.status, StatusCode::CONFLICT);

        let transport: ApiError = StoreError::Transport("timeout".into()).into();
        assert_eq!(transport.status, StatusCode::INTERNAL_SERVER_ERROR);
        // Internal details never leak into the response body.
        assert_eq!(transport.message, "internal error");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
