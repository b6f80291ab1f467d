use axum::extract::State;
use axum::response::Redirect;

use super::ApiError;
use crate::domain::authentication::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub async fn oauth_authorize(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let url = state.auth_service.oauth_authorize().await?;

    Ok(Redirect::to(&url))
}
