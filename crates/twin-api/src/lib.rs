//! # Twin API
//!
//! HTTP surface for Twin Anchor.
//!
//! Features:
//! - Axum router for scan anchoring and cross-ledger verification
//! - Quorum-gated reveal endpoints behind JWT authentication
//! - Tower middleware (request id, tracing, timeout, body limit, CORS)
//! - OpenAPI document at `/api-docs/openapi.json`
//! - Graceful shutdown

pub mod auth;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{Claims, JwtAuth};
pub use error::{ApiError, ApiResult};
pub use server::{ServerConfig, TwinServer};
pub use state::AppState;
