//! gRPC service implementation.
//!
//! ## Structure
//!
//! - [`handler`] - `UpvoteSystem` entry point (`CryptoService`), request
//!   validation, vote publishing and graceful shutdown.

pub mod handler;

pub use handler::{CryptoService, build_crypto_service};
