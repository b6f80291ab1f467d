use auth::AccessToken;
use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::authentication::errors::AuthError;
use crate::domain::authentication::errors::AuthenticationFailure;
use crate::domain::authentication::models::AuthSession;
use crate::user::models::User;

pub const TOKEN_TYPE: &str = "bearer";

pub mod get_current_user;
pub mod health;
pub mod oauth_authorize;
pub mod oauth_callback;
pub mod refresh;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    Unauthorized { message: String, code: &'static str },
    Forbidden { message: String, code: &'static str },
    Conflict { message: String, code: &'static str },
    BadRequest { message: String, code: &'static str },
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
            code: "INVALID_TOKEN",
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl From<InvalidHeaderValue> for ApiError {
    fn from(e: InvalidHeaderValue) -> Self {
        Self::InternalServerError(format!("Failed to build cookie: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::InternalServerError(detail) => {
                tracing::error!(%detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_ERROR",
                )
            }
            ApiError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg, "VALIDATION_ERROR")
            }
            ApiError::Unauthorized { message, code } => (StatusCode::UNAUTHORIZED, message, code),
            ApiError::Forbidden { message, code } => (StatusCode::FORBIDDEN, message, code),
            ApiError::Conflict { message, code } => (StatusCode::CONFLICT, message, code),
            ApiError::BadRequest { message, code } => (StatusCode::BAD_REQUEST, message, code),
        };

        (
            status,
            Json(ApiResponseBody::new_error(status, message, code)),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(e) => ApiError::UnprocessableEntity(e.to_string()),
            AuthError::Authentication(failure) => ApiError::Unauthorized {
                message: failure.public_message().to_string(),
                code: match failure {
                    AuthenticationFailure::Credentials(_) => "INVALID_CREDENTIALS",
                    AuthenticationFailure::Token(_) => "INVALID_TOKEN",
                },
            },
            AuthError::AccountLocked => ApiError::Forbidden {
                message: err.to_string(),
                code: "ACCOUNT_LOCKED",
            },
            AuthError::Conflict(e) => ApiError::Conflict {
                message: e.to_string(),
                code: e.code(),
            },
            AuthError::OAuth(e) => ApiError::BadRequest {
                message: e.to_string(),
                code: e.code(),
            },
            AuthError::Repository(_) | AuthError::StateStore(_) | AuthError::Internal(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String, code: &str) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData {
                message,
                code: code.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
    pub code: String,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserHttpData {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub auth_provider: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserHttpData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.to_string(),
            display_name: user.display_name.as_ref().map(|n| n.as_str().to_string()),
            auth_provider: user.auth_provider().to_string(),
            created_at: user.created_at,
        }
    }
}

/// Access token plus the signed-in user, returned by sign-up and sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthHttpResponseData {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserHttpData,
}

impl From<&AuthSession> for AuthHttpResponseData {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.token.clone(),
            token_type: TOKEN_TYPE,
            expires_in: session.access_token.expires_in,
            user: (&session.user).into(),
        }
    }
}

/// Access token without the user, returned by refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenHttpResponseData {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl From<&AccessToken> for TokenHttpResponseData {
    fn from(token: &AccessToken) -> Self {
        Self {
            access_token: token.token.clone(),
            token_type: TOKEN_TYPE,
            expires_in: token.expires_in,
        }
    }
}
