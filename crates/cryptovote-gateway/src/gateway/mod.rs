//! HTTP/JSON front end for the `UpvoteSystem` gRPC service.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration and the upstream channel.
//! - [`routes`] - The axum router; one handler per RPC.
//! - [`dto`] - JSON bodies and the `{"result": ...}` envelope.
//! - [`error`] - gRPC status to HTTP response mapping.
//! - [`telemetry`] - Console logging.

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod telemetry;

pub use error::GatewayError;
pub use routes::router;
