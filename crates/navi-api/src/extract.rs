//! Body extractors. Both read the body into a JSON object first and then
//! build the request type field by field, so a rejection lists every bad
//! field in the `VALIDATION_ERROR` envelope.

use std::collections::HashMap;

use axum::extract::{FromRequest, Request};
use serde_json::Value;

use navi_types::fields::{self, FromFields};

use crate::error::ApiError;

/// Local version of [`axum::Json`] for request bodies.
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: FromFields,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(body) = axum::Json::<Value>::from_request(req, state).await?;
        let value = fields::parse(&body).map_err(ApiError::Validation)?;
        Ok(Json(value))
    }
}

/// URL-encoded counterpart of [`Json`]. Every value arrives as a string.
pub struct Form<T>(pub T);

impl<T, S> FromRequest<S> for Form<T>
where
    T: FromFields,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Form(pairs) =
            axum::Form::<HashMap<String, String>>::from_request(req, state).await?;
        let body = Value::Object(
            pairs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        );
        let value = fields::parse(&body).map_err(ApiError::Validation)?;
        Ok(Form(value))
    }
}
