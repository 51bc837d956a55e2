use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of every response, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub code: String,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub const OK: &'static str = "OK";

    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            code: Self::OK.to_string(),
            message: message.into(),
            data,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, data: Value) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data,
        }
    }
}

/// One structured input problem, reported inside a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
