//! gRPC vote service and its live vote-sum broadcast.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration.
//! - [`telemetry`] - Logging, optional OpenTelemetry traces and metrics.
//! - [`store`] - The entity store contract and its in-memory implementation.
//! - [`broadcast`] - Subscriber registry and lossy fan-out.
//! - [`streaming`] - Per-stream subscription, forward loop, and watchdog.
//! - [`service`] - The `UpvoteSystem` gRPC service.

pub mod broadcast;
pub mod config;
pub mod service;
pub mod store;
pub mod streaming;
pub mod telemetry;
