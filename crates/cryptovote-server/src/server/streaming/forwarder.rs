use super::subscription::Subscription;
use cryptovote_core::{proto::StreamVoteSumResponse, types::Crypto};
use std::sync::Arc;
use tokio::sync::mpsc;
use tonic::Status;

/// Why a forward loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The watchdog (or a drop) tore the subscription down.
    TornDown,
    /// Forwarding to the caller failed.
    Disconnected,
    /// The channel was closed and fully drained.
    Drained,
}

/// Filters broadcast updates down to one record and forwards its vote sum to
/// the caller.
///
/// This is the FILTERING state of a vote-sum stream. Every update received on
/// `rx` whose id differs from [`Subscription::target`] is discarded. A match is
/// turned into a [`StreamVoteSumResponse`] and sent on `sink`, preserving the
/// order in which updates arrived on the channel.
///
/// # Arguments
///
/// - `subscription`: The registered subscription this loop serves.
/// - `rx`: Receiving half of the subscriber channel.
/// - `sink`: Channel feeding the gRPC response stream.
///
/// # Behavior
///
/// - Suspends only while waiting for the next update or while the caller's
///   stream is full; both waits are abandoned as soon as the subscription is
///   torn down.
/// - A failed send means the caller is gone: the loop tears the subscription
///   down itself.
/// - A `None` from `rx` is an ordinary end of stream.
/// - On exit the subscription is torn down (a no-op if the watchdog got there
///   first) and only then is `rx` closed.
pub async fn forward_vote_sums(
    subscription: Arc<Subscription>,
    mut rx: mpsc::Receiver<Crypto>,
    sink: mpsc::Sender<Result<StreamVoteSumResponse, Status>>,
) -> StreamEnd {
    let target = subscription.target();

    let end = loop {
        let crypto = tokio::select! {
            biased;
            () = subscription.closed() => break StreamEnd::TornDown,
            next = rx.recv() => match next {
                Some(crypto) => crypto,
                None => break StreamEnd::Drained,
            },
        };

        if crypto.id != target {
            continue;
        }

        let response = StreamVoteSumResponse {
            votes: crypto.vote_sum(),
        };
        let sent = tokio::select! {
            biased;
            () = subscription.closed() => break StreamEnd::TornDown,
            sent = sink.send(Ok(response)) => sent,
        };
        if let Err(e) = sent {
            tracing::debug!(subscriber = subscription.id(), "Failed to forward vote sum: {e}");
            break StreamEnd::Disconnected;
        }
    };

    subscription.teardown();
    rx.close();
    end
}
