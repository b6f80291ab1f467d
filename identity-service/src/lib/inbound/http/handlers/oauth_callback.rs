use axum::extract::Query;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use serde::Deserialize;

use crate::domain::authentication::errors::AuthError;
use crate::domain::authentication::models::OAuthCallback;
use crate::domain::authentication::models::OAuthLogin;
use crate::domain::authentication::ports::AuthServicePort;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::router::AppState;

const GENERIC_FAILURE_CODE: &str = "OAUTH_FAILED";

/// Finish the provider round trip and send the browser back to the frontend.
///
/// Every outcome is a redirect; failures carry an error code in the query.
pub async fn oauth_callback(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    Query(params): Query<OAuthCallbackParams>,
) -> Response {
    let callback = OAuthCallback {
        state: params.state.unwrap_or_default(),
        code: params.code,
        error: params.error,
    };

    match state.auth_service.oauth_callback(callback, client).await {
        Ok(login) => match success_cookies(&state, &login) {
            Ok(headers) => {
                (headers, Redirect::to(&frontend_redirect(&state, "success=true"))).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build OAuth session cookies");
                failure_redirect(&state, GENERIC_FAILURE_CODE)
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "OAuth callback failed");
            failure_redirect(&state, failure_code(&e))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCallbackParams {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
}

fn success_cookies(
    state: &AppState,
    login: &OAuthLogin,
) -> Result<HeaderMap, axum::http::header::InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        state.cookies.refresh_cookie(&login.session.refresh_secret)?,
    );
    headers.append(
        SET_COOKIE,
        state
            .cookies
            .access_handoff_cookie(&login.session.access_token.token)?,
    );
    Ok(headers)
}

fn failure_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::OAuth(e) => e.code(),
        AuthError::Conflict(e) => e.code(),
        _ => GENERIC_FAILURE_CODE,
    }
}

fn failure_redirect(state: &AppState, code: &str) -> Response {
    Redirect::to(&frontend_redirect(state, &format!("error={}", code))).into_response()
}

fn frontend_redirect(state: &AppState, query: &str) -> String {
    format!(
        "{}/auth/callback?{}",
        state.frontend_url.trim_end_matches('/'),
        query
    )
}
