use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::UserHttpData;
use crate::inbound::http::middleware::CurrentUser;

pub async fn get_current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<ApiSuccess<UserHttpData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, (&user).into()))
}
