use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use feedwatch_types::api::ErrorBody;

use crate::auth::IssuedSession;

/// Failures of the code-for-session exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The provider rejected the code: expired, malformed or already used.
    #[error("{0}")]
    ExchangeFailed(String),

    #[error("Session not found")]
    SessionMissing,

    #[error("Failed to issue session: {0}")]
    SessionIssueFailed(#[source] anyhow::Error),

    /// Identity is established but the provider token was not stored.
    /// The issued session stays valid for the caller.
    #[error("Failed to store provider token: {source}")]
    PersistenceFailed {
        issued: IssuedSession,
        #[source]
        source: anyhow::Error,
    },
}

impl ExchangeError {
    /// The session that survives a partial failure, if any.
    pub fn issued_session(&self) -> Option<&IssuedSession> {
        match self {
            Self::PersistenceFailed { issued, .. } => Some(issued),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0}")]
    Validation(String),

    #[error("This URL already exists in your channels")]
    DuplicateUrl,

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Everything a handler can fail with, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Exchange(ExchangeError::ExchangeFailed(_) | ExchangeError::SessionMissing) => {
                StatusCode::BAD_REQUEST
            }
            Self::Exchange(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Registry(RegistryError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Registry(RegistryError::DuplicateUrl) => StatusCode::CONFLICT,
            Self::Registry(RegistryError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Search(SearchError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Search(SearchError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
