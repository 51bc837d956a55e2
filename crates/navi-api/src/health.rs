use axum::extract::State;

use navi_types::api::HealthResponse;

use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    Ok(ApiResponse::ok(
        "ok",
        HealthResponse {
            status: "ok".into(),
            env: state.config.app_env.clone(),
        },
    ))
}
