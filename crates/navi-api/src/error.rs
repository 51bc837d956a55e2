use std::any::Any;

use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use navi_types::envelope::{Envelope, FieldError};
use navi_types::validation::Validate;

use crate::credentials::CredentialError;

pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// Every failure a request can end in. Domain variants carry an optional
/// explicit machine code; without one the code comes from the status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Unauthenticated {
        code: Option<&'static str>,
        message: String,
    },
    #[error("{message}")]
    AlreadyExists {
        code: Option<&'static str>,
        message: String,
    },
    #[error("{message}")]
    NotFound {
        code: Option<&'static str>,
        message: String,
    },
    #[error("{message}")]
    BadRequest {
        code: Option<&'static str>,
        message: String,
    },
    #[error("request validation failed")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated {
            code: None,
            message: message.into(),
        }
    }

    pub fn bad_credentials() -> Self {
        ApiError::Unauthenticated {
            code: Some("BAD_CREDENTIALS"),
            message: "bad credentials".into(),
        }
    }

    pub fn username_exists() -> Self {
        ApiError::AlreadyExists {
            code: Some("USERNAME_EXISTS"),
            message: "username already exists".into(),
        }
    }

    /// Used both for missing markers and for markers the caller may not
    /// touch, so existence never leaks.
    pub fn marker_not_found() -> Self {
        ApiError::NotFound {
            code: Some("MARKER_NOT_FOUND"),
            message: "marker not found".into(),
        }
    }

    pub fn user_not_found() -> Self {
        ApiError::NotFound {
            code: Some("USER_NOT_FOUND"),
            message: "user not found".into(),
        }
    }

    pub fn share_not_found() -> Self {
        ApiError::NotFound {
            code: Some("SHARE_NOT_FOUND"),
            message: "share not found".into(),
        }
    }

    pub fn route_not_found() -> Self {
        ApiError::NotFound {
            code: None,
            message: "route not found".into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: Some("BAD_REQUEST"),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ApiError::AlreadyExists { .. } => StatusCode::CONFLICT,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Explicit code if one was attached, else the status lookup, else
    /// `INTERNAL_ERROR`.
    pub fn code(&self) -> &'static str {
        let explicit = match self {
            ApiError::Unauthenticated { code, .. }
            | ApiError::AlreadyExists { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::BadRequest { code, .. } => *code,
            ApiError::Validation(_) | ApiError::Internal(_) => None,
        };

        explicit
            .or_else(|| code_for_status(self.status()))
            .unwrap_or(INTERNAL_ERROR)
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Validation(_) => "validation error".into(),
            ApiError::Internal(_) => "internal server error".into(),
            other => other.to_string(),
        }
    }
}

pub fn code_for_status(status: StatusCode) -> Option<&'static str> {
    let code = match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
        StatusCode::INTERNAL_SERVER_ERROR => INTERNAL_ERROR,
        _ => return None,
    };
    Some(code)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let data = match &self {
            ApiError::Validation(errors) => {
                serde_json::to_value(errors).unwrap_or(Value::Null)
            }
            ApiError::Internal(err) => {
                error!(error = ?err, "Unhandled error while serving request");
                Value::Null
            }
            other => {
                debug!(code = other.code(), "Request failed: {}", other);
                Value::Null
            }
        };

        let envelope = Envelope::error(self.code(), self.client_message(), data);
        (status, Json(envelope)).into_response()
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        debug!("Rejected bearer token: {}", err);
        ApiError::unauthenticated("could not validate credentials")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected JSON body: {}", rejection.body_text());
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => "expected an application/json body",
            JsonRejection::JsonSyntaxError(_) => "body is not valid JSON",
            JsonRejection::JsonDataError(_) => "body does not match the expected shape",
            _ => "could not read the request body",
        };
        ApiError::Validation(vec![FieldError::new("body", message)])
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        debug!("Rejected form body: {}", rejection.body_text());
        let message = match rejection {
            FormRejection::InvalidFormContentType(_) => {
                "expected an application/x-www-form-urlencoded body"
            }
            _ => "body is not a valid form",
        };
        ApiError::Validation(vec![FieldError::new("body", message)])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Rejected path: {}", rejection.body_text());
        ApiError::Validation(vec![FieldError::new("path", "must be an integer id")])
    }
}

/// Run structural validation, failing with every field error at once.
pub fn ensure_valid<T: Validate>(input: &T) -> Result<(), ApiError> {
    let errors = input.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Panic hook for `CatchPanicLayer`: log what we can, answer with the
/// generic internal error.
pub fn catch_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "<unknown>".into()
    };

    ApiError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_code_wins() {
        let err = ApiError::marker_not_found();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "MARKER_NOT_FOUND");
        assert_eq!(ApiError::username_exists().code(), "USERNAME_EXISTS");
        assert_eq!(ApiError::bad_credentials().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn status_lookup_fills_missing_code() {
        assert_eq!(ApiError::unauthenticated("no token").code(), "UNAUTHORIZED");
        assert_eq!(ApiError::route_not_found().code(), "NOT_FOUND");
        assert_eq!(ApiError::Validation(vec![]).code(), "VALIDATION_ERROR");
    }

    #[test]
    fn unknown_status_falls_back_to_internal() {
        assert_eq!(code_for_status(StatusCode::IM_A_TEAPOT), None);
        let err = ApiError::Internal(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.code(), INTERNAL_ERROR);
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::Internal(anyhow::anyhow!("SELECT * FROM secrets"));
        assert_eq!(err.client_message(), "internal server error");
    }
}
