//! Snackline API crate - axum HTTP server.
//!
//! Provides the REST API for the Snackline application: login/session
//! handling with per-role route gating, the dashboard aggregation
//! endpoint, spreadsheet export endpoints, and record insertion.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
