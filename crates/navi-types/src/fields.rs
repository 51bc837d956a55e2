//! Field-by-field reading of request bodies.
//!
//! Bodies are read as a JSON object and each field is pulled out on its
//! own, so a body missing three fields reports three errors instead of
//! stopping at the first one serde trips over.

use serde_json::{Map, Value};

use crate::api::{
    CreateMarkerRequest, LoginForm, RegisterRequest, ShareMarkerRequest, UpdateMarkerRequest,
};
use crate::envelope::FieldError;

pub const MISSING: &str = "field required";
pub const UNKNOWN: &str = "unknown field";

/// A request body that can be built from a JSON object.
pub trait FromFields: Sized {
    /// Whether keys the type does not read are errors.
    const DENY_UNKNOWN: bool = true;

    /// Read every field through `fields`. Missing or mistyped fields are
    /// recorded there and stand-in values returned; the result is thrown
    /// away when anything was recorded.
    fn from_fields(fields: &mut Fields<'_>) -> Self;
}

/// Parse `body` into `T`, or every field problem found.
pub fn parse<T: FromFields>(body: &Value) -> Result<T, Vec<FieldError>> {
    let Some(object) = body.as_object() else {
        return Err(vec![FieldError::new("body", "must be a JSON object")]);
    };

    let mut fields = Fields {
        object,
        read: Vec::new(),
        errors: Vec::new(),
    };
    let value = T::from_fields(&mut fields);

    if T::DENY_UNKNOWN {
        for key in object.keys() {
            if !fields.read.contains(&key.as_str()) {
                fields.errors.push(FieldError::new(key.as_str(), UNKNOWN));
            }
        }
    }

    if fields.errors.is_empty() {
        Ok(value)
    } else {
        Err(fields.errors)
    }
}

pub struct Fields<'a> {
    object: &'a Map<String, Value>,
    read: Vec<&'static str>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    /// Explicit `null` counts as absent.
    fn get(&mut self, name: &'static str) -> Option<&'a Value> {
        self.read.push(name);
        self.object.get(name).filter(|v| !v.is_null())
    }

    fn wrong_type(&mut self, name: &'static str, expected: &str) {
        self.errors.push(FieldError::new(name, format!("must be {expected}")));
    }

    fn missing(&mut self, name: &'static str) {
        self.errors.push(FieldError::new(name, MISSING));
    }

    pub fn string(&mut self, name: &'static str) -> String {
        self.opt_string(name).unwrap_or_else(|| {
            if !self.has_error(name) {
                self.missing(name);
            }
            String::new()
        })
    }

    pub fn opt_string(&mut self, name: &'static str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.wrong_type(name, "a string");
                None
            }
        }
    }

    pub fn number(&mut self, name: &'static str) -> f64 {
        self.opt_number(name).unwrap_or_else(|| {
            if !self.has_error(name) {
                self.missing(name);
            }
            0.0
        })
    }

    pub fn opt_number(&mut self, name: &'static str) -> Option<f64> {
        match self.get(name)? {
            Value::Number(n) => n.as_f64(),
            _ => {
                self.wrong_type(name, "a number");
                None
            }
        }
    }

    pub fn opt_bool(&mut self, name: &'static str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.wrong_type(name, "a boolean");
                None
            }
        }
    }

    fn has_error(&self, name: &str) -> bool {
        self.errors.iter().any(|e| e.field == name)
    }
}

impl FromFields for RegisterRequest {
    fn from_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            username: fields.string("username"),
            password: fields.string("password"),
        }
    }
}

/// Form fields arrive as strings. OAuth2 extras (grant_type, scope,
/// client_id) are ignored.
impl FromFields for LoginForm {
    const DENY_UNKNOWN: bool = false;

    fn from_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            username: fields.string("username"),
            password: fields.string("password"),
        }
    }
}

impl FromFields for CreateMarkerRequest {
    fn from_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            title: fields.string("title"),
            note: fields.opt_string("note"),
            lat: fields.number("lat"),
            lng: fields.number("lng"),
            visible: fields.opt_bool("visible"),
        }
    }
}

impl FromFields for UpdateMarkerRequest {
    fn from_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            title: fields.opt_string("title"),
            note: fields.opt_string("note"),
            lat: fields.opt_number("lat"),
            lng: fields.opt_number("lng"),
            visible: fields.opt_bool("visible"),
        }
    }
}

impl FromFields for ShareMarkerRequest {
    fn from_fields(fields: &mut Fields<'_>) -> Self {
        Self {
            username: fields.string("username"),
            can_edit: fields.opt_bool("can_edit").unwrap_or(false),
        }
    }
}
