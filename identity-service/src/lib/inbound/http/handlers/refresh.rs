use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;

use super::ApiError;
use super::ApiSuccess;
use super::TokenHttpResponseData;
use crate::domain::authentication::ports::AuthServicePort;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::cookies::presented_refresh_secret;
use crate::inbound::http::router::AppState;

pub async fn refresh(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    jar: CookieJar,
) -> Result<(HeaderMap, ApiSuccess<TokenHttpResponseData>), ApiError> {
    let secret = presented_refresh_secret(&jar)
        .ok_or_else(|| ApiError::unauthorized("Refresh token not found"))?;

    let refreshed = state.auth_service.refresh(secret, client).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        state.cookies.refresh_cookie(&refreshed.refresh_secret)?,
    );

    Ok((
        headers,
        ApiSuccess::new(StatusCode::OK, (&refreshed.access_token).into()),
    ))
}
