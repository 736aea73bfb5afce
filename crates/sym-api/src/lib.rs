//! SYM API crate - axum HTTP server and route handlers.
//!
//! Exposes audio intake, sentiment analysis, customer-detail enrichment,
//! report generation and the dashboard aggregates as JSON endpoints.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
