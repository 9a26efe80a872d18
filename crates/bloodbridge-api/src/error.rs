use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use bloodbridge_types::TransitionError;

/// Handler error. Every variant but `Internal` carries the user-facing
/// messages verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    messages: Vec<String>,
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::OwnRequest | TransitionError::NotRequester => {
                Self::Forbidden(err.to_string())
            }
            TransitionError::NoLongerAvailable
            | TransitionError::NotAccepted
            | TransitionError::AlreadyDonated
            | TransitionError::AlreadyCancelled => Self::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let messages = match self {
            Self::Validation(messages) => messages,
            Self::Unauthorized(m) | Self::Forbidden(m) | Self::NotFound(m) | Self::Conflict(m) => {
                vec![m]
            }
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                vec!["Something went wrong. Please try again.".to_string()]
            }
        };

        (status, Json(ErrorBody { error: kind, messages })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_map_to_status() {
        assert_eq!(ApiError::from(TransitionError::OwnRequest).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(TransitionError::NotRequester).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(TransitionError::NoLongerAvailable).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::from(TransitionError::NotAccepted).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_hide_details() {
        let resp = ApiError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
