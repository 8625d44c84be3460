use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failures coming out of a `UserRepository`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field `{0}`")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Classifies a sqlx error, turning unique-constraint violations into `Conflict`.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = match db_err.constraint() {
                    Some(c) if c.contains("email") => "email",
                    Some(c) if c.contains("username") => "username",
                    _ => "unknown",
                };
                return StoreError::Conflict(field.to_string());
            }
        }
        StoreError::Unavailable(err)
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("credential processing failed: {0}")]
    Credentials(#[source] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Every way a request can fail, already sorted by HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not found")]
    NotFound,

    #[error("Conflict on {0}")]
    Conflict(String),

    #[error("Upstream store failure: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::InvalidCredentials => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store failures on role and activation routes surface as 502.
    pub fn upstream(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(StoreError::Unavailable(e)) => ApiError::BadGateway(e.to_string()),
            other => other.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => ApiError::Conflict(field),
            StoreError::Unavailable(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => e.into(),
            ServiceError::Credentials(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "rejected request body");
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!(error = %rejection, "rejected path parameter");
        ApiError::Validation(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::Internal(format!("session: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match &self {
            ApiError::Validation(msg) => ("validation_error", msg.clone()),
            ApiError::Unauthorized => ("unauthorized", "Unauthorized".to_string()),
            ApiError::Forbidden => ("forbidden", "Forbidden".to_string()),
            ApiError::InvalidCredentials => {
                ("invalid_credentials", "Invalid username or password".to_string())
            }
            ApiError::NotFound => ("not_found", "User not found".to_string()),
            ApiError::Conflict(field) => ("conflict", format!("{field} already registered")),
            ApiError::BadGateway(detail) => {
                error!(error = %detail, "store failure");
                ("bad_gateway", "Store unavailable".to_string())
            }
            ApiError::Internal(detail) => {
                error!(error = %detail, "internal error");
                ("internal_error", "An internal error occurred".to_string())
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "type": error_type,
                    "message": message
                }
            })),
        )
            .into_response()
    }
}
