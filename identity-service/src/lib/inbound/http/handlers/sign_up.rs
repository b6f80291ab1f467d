use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::AuthHttpResponseData;
use crate::domain::authentication::models::SignUpCommand;
use crate::domain::authentication::ports::AuthServicePort;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::router::AppState;

pub async fn sign_up(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    Json(body): Json<SignUpHttpRequestBody>,
) -> Result<(HeaderMap, ApiSuccess<AuthHttpResponseData>), ApiError> {
    let session = state
        .auth_service
        .sign_up(body.into_command(), client)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        state.cookies.refresh_cookie(&session.refresh_secret)?,
    );

    Ok((
        headers,
        ApiSuccess::new(StatusCode::CREATED, (&session).into()),
    ))
}

/// Raw sign-up body. Validation happens in the service.
#[derive(Clone, Deserialize)]
pub struct SignUpHttpRequestBody {
    email: String,
    password: String,
    password_confirm: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl SignUpHttpRequestBody {
    fn into_command(self) -> SignUpCommand {
        SignUpCommand {
            email: self.email,
            password: self.password,
            password_confirm: self.password_confirm,
            display_name: self.display_name,
        }
    }
}
