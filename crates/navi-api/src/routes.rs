use axum::{
    Json, Router,
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use navi_types::envelope::Envelope;

use crate::error::{self, ApiError};
use crate::middleware::{UuidRequestId, X_REQUEST_ID, require_auth, trace_request};
use crate::state::AppState;
use crate::{auth, health, markers};

/// The whole HTTP surface, boundary layers included.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/markers", get(markers::list_markers).post(markers::create_marker))
        .route("/markers/{id}", put(markers::update_marker).delete(markers::delete_marker))
        .route("/markers/{id}/share", post(markers::share_marker))
        .route("/markers/{id}/shares", get(markers::list_shares))
        .route("/markers/{id}/share/{user_id}", delete(markers::remove_share))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let boundary = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_request))
        .layer(CatchPanicLayer::custom(error::catch_panic))
        .layer(CorsLayer::permissive());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
        .layer(boundary)
}

async fn not_found(method: Method) -> Response {
    match method {
        Method::HEAD => StatusCode::NOT_FOUND.into_response(),
        _ => ApiError::route_not_found().into_response(),
    }
}

async fn method_not_allowed() -> Response {
    let envelope = Envelope::error("METHOD_NOT_ALLOWED", "method not allowed", serde_json::Value::Null);
    (StatusCode::METHOD_NOT_ALLOWED, Json(envelope)).into_response()
}
