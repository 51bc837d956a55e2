pub mod access;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod health;
pub mod markers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;

pub use routes::app;
pub use state::{AppState, AppStateInner};
