use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::{Instrument, Span, debug};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");

/// The caller behind a validated bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
}

/// Extract and validate the bearer token, then confirm the user still exists.
/// The caller is recorded on the surrounding `http.request` span.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthenticated("not authenticated"))?;

    let subject = state.credentials.resolve_token(token)?;

    let user_id = subject.user_id;
    let user = run_blocking(&state, move |s| Ok(s.db.get_user_by_id(user_id)?))
        .await?
        .ok_or_else(|| {
            debug!(user_id, "Token subject no longer exists");
            ApiError::unauthenticated("could not validate credentials")
        })?;

    let span = Span::current();
    span.record("user.id", user.id);
    span.record("user.name", user.username.as_str());

    req.extensions_mut().insert(AuthUser { id: user.id });
    Ok(next.run(req).await)
}

/// The credentials of an `Authorization: Bearer <token>` header. The scheme
/// is matched case-insensitively.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Request id generator for `SetRequestIdLayer`: random UUIDs.
#[derive(Debug, Default, Clone)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Wraps each request in an `http.request` span and stamps the response
/// with the time spent, in milliseconds.
pub async fn trace_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let target = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let span = tracing::info_span!(
        "http.request",
        http.method = %method,
        http.target = %target,
        http.status_code = tracing::field::Empty,
        request.id = %request_id,
        request.duration = tracing::field::Empty,
        user.id = tracing::field::Empty,
        user.name = tracing::field::Empty,
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed = start.elapsed();

    let status = response.status();
    span.record("http.status_code", status.as_u16());
    span.record("request.duration", tracing::field::debug(elapsed));
    span.in_scope(|| debug!("{method} {target} -> {status} ({elapsed:?})"));

    let millis = format!("{:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(value) = HeaderValue::from_str(&millis) {
        response.headers_mut().insert(X_PROCESS_TIME, value);
    }

    response
}
