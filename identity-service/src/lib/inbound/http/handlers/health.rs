use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;

pub async fn health() -> ApiSuccess<HealthHttpResponseData> {
    ApiSuccess::new(StatusCode::OK, HealthHttpResponseData { status: "ok" })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthHttpResponseData {
    pub status: &'static str,
}
