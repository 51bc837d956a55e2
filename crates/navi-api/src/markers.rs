use axum::{
    Extension,
    extract::{Path, State, rejection::PathRejection},
};

use navi_types::api::{
    CreateMarkerRequest, DeletedResponse, MarkerResponse, RemovedResponse, ShareEntry,
    ShareMarkerRequest, ShareResponse, UpdateMarkerRequest,
};

use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::response::{ApiResponse, ApiResult};
use crate::service;
use crate::state::{AppState, run_blocking};

pub async fn list_markers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<MarkerResponse>> {
    let markers = run_blocking(&state, move |s| service::list_markers(&s.db, user.id)).await?;
    Ok(ApiResponse::ok("markers", markers))
}

pub async fn create_marker(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateMarkerRequest>,
) -> ApiResult<MarkerResponse> {
    let marker = run_blocking(&state, move |s| service::create_marker(&s.db, user.id, req)).await?;
    Ok(ApiResponse::ok("marker created", marker))
}

pub async fn update_marker(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
    Json(req): Json<UpdateMarkerRequest>,
) -> ApiResult<MarkerResponse> {
    let Path(marker_id) = path?;
    let marker = run_blocking(&state, move |s| {
        service::update_marker(&s.db, user.id, marker_id, req)
    })
    .await?;
    Ok(ApiResponse::ok("marker updated", marker))
}

pub async fn delete_marker(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeletedResponse> {
    let Path(marker_id) = path?;
    run_blocking(&state, move |s| service::delete_marker(&s.db, user.id, marker_id)).await?;
    Ok(ApiResponse::ok("marker deleted", DeletedResponse { deleted: true }))
}

pub async fn share_marker(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
    Json(req): Json<ShareMarkerRequest>,
) -> ApiResult<ShareResponse> {
    let Path(marker_id) = path?;
    let share = run_blocking(&state, move |s| {
        service::share_marker(&s.db, user.id, marker_id, req)
    })
    .await?;
    Ok(ApiResponse::ok("marker shared", share))
}

pub async fn list_shares(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<ShareEntry>> {
    let Path(marker_id) = path?;
    let shares =
        run_blocking(&state, move |s| service::list_shares(&s.db, user.id, marker_id)).await?;
    Ok(ApiResponse::ok("shares", shares))
}

pub async fn remove_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<RemovedResponse> {
    let Path((marker_id, grantee_id)) = path?;
    run_blocking(&state, move |s| {
        service::remove_share(&s.db, user.id, marker_id, grantee_id)
    })
    .await?;
    Ok(ApiResponse::ok("share removed", RemovedResponse { removed: true }))
}
