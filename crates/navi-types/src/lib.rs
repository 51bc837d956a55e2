pub mod api;
pub mod envelope;
pub mod fields;
pub mod validation;
