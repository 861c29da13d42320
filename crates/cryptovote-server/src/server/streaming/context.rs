//! Call-scoped cancellation and deadline state.
//!
//! A [`CallContext`] bundles the two signals that end a streaming call from
//! the server's point of view: an explicit cancellation (a child of the
//! service-wide shutdown token) and an optional deadline taken from the
//! client's `grpc-timeout` header.

use core::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataMap;

/// Request header carrying the client's deadline.
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Why a call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallEnd {
    Cancelled,
    DeadlineExceeded,
}

#[derive(Clone, Debug)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub const fn new(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { token, deadline }
    }

    /// Builds the context for an incoming request. The call is cancelled
    /// together with `shutdown`, and expires at the `grpc-timeout` deadline
    /// if the client sent one.
    pub fn from_metadata(metadata: &MetadataMap, shutdown: &CancellationToken) -> Self {
        let deadline = metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
            .and_then(|timeout| Instant::now().checked_add(timeout));

        Self::new(shutdown.child_token(), deadline)
    }

    #[cfg(test)]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| d <= Instant::now())
    }

    /// Resolves once the call is cancelled or its deadline passes.
    pub async fn done(&self) -> CallEnd {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => core::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => CallEnd::Cancelled,
            () = deadline => CallEnd::DeadlineExceeded,
        }
    }
}

/// Parses a `grpc-timeout` value: at most 8 ASCII digits followed by one of
/// `H`, `M`, `S`, `m`, `u`, `n`.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let (digits, unit) = value.split_at_checked(value.len().checked_sub(1)?)?;
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}
