//! Types shared by the server, the gateway, and any other gRPC client.
//!
//! - [`error`] - The service error enum and its mapping onto `tonic::Status`.
//! - [`types`] - The vote entity, its identifier, and proto conversions.
//! - [`proto`] - Generated messages, client, and server for `UpvoteSystem`.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from
/// `proto/cryptovote.proto`.
///
/// ## Service
///
/// - `UpvoteSystem` - CRUD over cryptocurrency records, vote counters, and a
///   live vote-sum stream.
///
/// See `proto/cryptovote.proto` for the full schema.
pub mod proto {
    tonic::include_proto!("cryptovote");

    /// Encoded descriptor set for `tonic-reflection`.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("cryptovote_descriptor");
}
