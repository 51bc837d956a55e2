use crate::api::{CreateMarkerRequest, RegisterRequest, ShareMarkerRequest, UpdateMarkerRequest};
use crate::envelope::FieldError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 64;
pub const PASSWORD_MAX: usize = 128;
pub const TITLE_MAX: usize = 128;
pub const NOTE_MAX: usize = 255;

/// Structural checks on a request body. Returns every problem found, empty
/// when the body is acceptable.
pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let len = self.username.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
            errors.push(FieldError::new(
                "username",
                format!("must be between {USERNAME_MIN} and {USERNAME_MAX} characters"),
            ));
        } else if self.username.trim() != self.username {
            errors.push(FieldError::new(
                "username",
                "must not start or end with whitespace",
            ));
        }

        let len = self.password.chars().count();
        if len == 0 {
            errors.push(FieldError::new("password", "must not be empty"));
        } else if len > PASSWORD_MAX {
            errors.push(FieldError::new(
                "password",
                format!("must be at most {PASSWORD_MAX} characters"),
            ));
        }

        errors
    }
}

impl Validate for CreateMarkerRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_title(&self.title, &mut errors);
        if let Some(note) = &self.note {
            check_note(note, &mut errors);
        }
        check_coordinate("lat", self.lat, &mut errors);
        check_coordinate("lng", self.lng, &mut errors);
        errors
    }
}

impl Validate for UpdateMarkerRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_title(title, &mut errors);
        }
        if let Some(note) = &self.note {
            check_note(note, &mut errors);
        }
        if let Some(lat) = self.lat {
            check_coordinate("lat", lat, &mut errors);
        }
        if let Some(lng) = self.lng {
            check_coordinate("lng", lng, &mut errors);
        }
        errors
    }
}

impl Validate for ShareMarkerRequest {
    fn validate(&self) -> Vec<FieldError> {
        if self.username.is_empty() {
            vec![FieldError::new("username", "must not be empty")]
        } else {
            Vec::new()
        }
    }
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) {
    let len = title.chars().count();
    if len == 0 {
        errors.push(FieldError::new("title", "must not be empty"));
    } else if len > TITLE_MAX {
        errors.push(FieldError::new(
            "title",
            format!("must be at most {TITLE_MAX} characters"),
        ));
    }
}

fn check_note(note: &str, errors: &mut Vec<FieldError>) {
    if note.chars().count() > NOTE_MAX {
        errors.push(FieldError::new(
            "note",
            format!("must be at most {NOTE_MAX} characters"),
        ));
    }
}

// No range check: only NaN and infinities are rejected.
fn check_coordinate(field: &str, value: f64, errors: &mut Vec<FieldError>) {
    if !value.is_finite() {
        errors.push(FieldError::new(field, "must be a finite number"));
    }
}
