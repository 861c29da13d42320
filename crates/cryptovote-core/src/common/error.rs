//! Error types for the vote service.
//!
//! This module defines the central `Error` enum, which captures every
//! recoverable and reportable error case of the service. It implements
//! `From<Error>` for `tonic::Status` so handlers can propagate with `?` and
//! clients receive the matching gRPC status code.
//!
//! ## Error Cases
//! - `InvalidId`: The supplied identifier is not 24 hex characters.
//! - `EmptyFields`: A create or update left `name` or `description` blank.
//! - `NotFound`: No record exists for the identifier.
//! - `AlreadyExists`: Another record already uses the name.
//! - `MissingPayload`: The request carried no `crypto` message.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the vote service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The identifier could not be parsed.
    #[error("the provided hex string is not a valid id: {id:?}")]
    InvalidId { id: String },

    /// `name` and `description` must both be non-empty.
    #[error("Empty fields")]
    EmptyFields,

    /// No record with this identifier.
    #[error("Couldn't find Cryptocurrency with id {id}")]
    NotFound { id: String },

    /// A record with this name is already stored.
    #[error("Cryptocurrency {name:?} already exists")]
    AlreadyExists { name: String },

    /// The request message omitted its `crypto` field.
    #[error("Missing cryptocurrency payload")]
    MissingPayload,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::InvalidId { .. } | Error::EmptyFields | Error::MissingPayload => {
                Status::invalid_argument(message)
            }
            Error::NotFound { .. } => Status::not_found(message),
            Error::AlreadyExists { .. } => Status::already_exists(message),
            Error::ServiceShutdown => Status::unavailable(message),
        }
    }
}
