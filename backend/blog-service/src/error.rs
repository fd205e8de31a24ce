/// Error types for Blog Service
///
/// Every failure is terminal for the request and is rendered as an HTTP
/// response; nothing is retried.
use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage backend failed
    #[error("Database error: {0}")]
    Database(String),

    /// Media storage failed
    #[error("Media error: {0}")]
    Media(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anonymous access to a protected route; rendered as a login redirect
    #[error("Login required for {next}")]
    LoginRequired { login_url: String, next: String },

    /// Malformed request that never reached form validation
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// `Location` value for a login redirect; path separators stay readable
    pub fn login_location(login_url: &str, next: &str) -> String {
        let next = urlencoding::encode(next).replace("%2F", "/");
        format!("{}?next={}", login_url, next)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LoginRequired { .. } => StatusCode::FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::LoginRequired { login_url, next } = self {
            return HttpResponse::Found()
                .insert_header((header::LOCATION, Self::login_location(login_url, next)))
                .finish();
        }

        let status = self.status_code();
        let error_msg = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Database(format!("{:#}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<crate::media::MediaError> for AppError {
    fn from(err: crate::media::MediaError) -> Self {
        AppError::Media(err.to_string())
    }
}
