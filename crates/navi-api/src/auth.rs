use axum::extract::State;
use chrono::Utc;
use tracing::{debug, info};

use navi_db::{Database, is_unique_violation};
use navi_types::api::{LoginForm, RegisterRequest, TokenResponse, UserResponse};

use crate::credentials::{self, Credentials};
use crate::error::{ApiError, ensure_valid};
use crate::extract::{Form, Json};
use crate::response::{ApiResponse, ApiResult};
use crate::state::{AppState, run_blocking};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<UserResponse> {
    let user = run_blocking(&state, move |s| register_user(&s.db, req)).await?;
    Ok(ApiResponse::ok("registered", user))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<TokenResponse> {
    let token = run_blocking(&state, move |s| login_user(&s.db, &s.credentials, form)).await?;
    Ok(ApiResponse::ok("login ok", token))
}

/// Create an account. The pre-check gives the common case a clean error;
/// the unique constraint settles concurrent registrations.
pub fn register_user(db: &Database, req: RegisterRequest) -> Result<UserResponse, ApiError> {
    ensure_valid(&req)?;

    if db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::username_exists());
    }

    let password_hash = credentials::hash_password(&req.password)?;

    let user = match db.create_user(&req.username, &password_hash, Utc::now()) {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => return Err(ApiError::username_exists()),
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, username = %user.username, "User registered");
    Ok(UserResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        created_at: user.created_at,
    })
}

pub fn login_user(
    db: &Database,
    credentials: &Credentials,
    form: LoginForm,
) -> Result<TokenResponse, ApiError> {
    let Some(user) = db.get_user_by_username(&form.username)? else {
        credentials::verify_against_dummy(&form.password);
        debug!(username = %form.username, "Login for unknown user");
        return Err(ApiError::bad_credentials());
    };

    if !credentials::verify_password(&form.password, &user.password_hash) {
        debug!(user_id = user.id, "Login with wrong password");
        return Err(ApiError::bad_credentials());
    }

    let token = credentials.issue_token(user.id, &user.username)?;
    Ok(TokenResponse::bearer(token))
}
