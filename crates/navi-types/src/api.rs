use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Bearer token claims. `sub` is the user id rendered as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// OAuth2 password-grant style form.
#[derive(Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

// -- Markers --

#[derive(Debug)]
pub struct CreateMarkerRequest {
    pub title: String,
    pub note: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub visible: Option<bool>,
}

/// Partial update: absent (or null) fields are left untouched.
#[derive(Debug, Default)]
pub struct UpdateMarkerRequest {
    pub title: Option<String>,
    pub note: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub visible: Option<bool>,
}

/// A marker as seen by one caller, with that caller's capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerResponse {
    pub id: i64,
    pub owner_id: i64,
    pub owner_username: String,
    pub title: String,
    pub note: String,
    pub lat: f64,
    pub lng: f64,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

// -- Shares --

#[derive(Debug)]
pub struct ShareMarkerRequest {
    pub username: String,
    pub can_edit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    pub marker_id: i64,
    pub username: String,
    pub can_edit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareEntry {
    pub share_id: i64,
    pub user_id: i64,
    pub username: String,
    pub can_edit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

// -- Health --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub env: String,
}
