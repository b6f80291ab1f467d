use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::AuthHttpResponseData;
use crate::domain::authentication::models::SignInCommand;
use crate::domain::authentication::ports::AuthServicePort;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::router::AppState;

pub async fn sign_in(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    Json(body): Json<SignInHttpRequestBody>,
) -> Result<(HeaderMap, ApiSuccess<AuthHttpResponseData>), ApiError> {
    let command = SignInCommand {
        email: body.email,
        password: body.password,
    };
    let session = state.auth_service.sign_in(command, client).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        state.cookies.refresh_cookie(&session.refresh_secret)?,
    );

    Ok((headers, ApiSuccess::new(StatusCode::OK, (&session).into())))
}

#[derive(Clone, Deserialize)]
pub struct SignInHttpRequestBody {
    email: String,
    password: String,
}
