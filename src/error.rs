use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Failure of a call into the persistence, storage, auth or catalog backends.
/// Always carries the backend's own message.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] reqwest::Error),

    #[error("Auth error: {0}")]
    Auth(#[from] bcrypt::BcryptError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Backend(BackendError::Database(e))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Backend(BackendError::Pool(e))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Backend(BackendError::Storage(e))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Backend(BackendError::Catalog(e))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Backend(BackendError::Auth(e))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::Backend(e @ BackendError::Catalog(_)) => {
                tracing::error!("{}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            AppError::Backend(e) => {
                tracing::error!("{}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// A stored file could not be removed after its metadata row was deleted.
/// Reported next to the successful delete, never as a failure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartialCleanupWarning {
    pub bucket: String,
    pub key: String,
    pub reason: String,
}

impl PartialCleanupWarning {
    pub fn log(&self) {
        tracing::warn!(
            bucket = %self.bucket,
            key = %self.key,
            "Stored file left behind after delete: {}",
            self.reason
        );
    }
}
