use super::{
    context::CallContext,
    forwarder::forward_vote_sums,
    subscription::Subscription,
    watchdog::spawn_watchdog,
};
use crate::server::{
    broadcast::SubscriberRegistry,
    telemetry::{decrement_streams_inflight, increment_streams_inflight, record_stream_duration},
};
use cryptovote_core::{proto::StreamVoteSumResponse, types::CryptoId};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;
use tracing::Instrument;

/// Buffer sizes for one vote-sum stream.
#[derive(Clone, Copy, Debug)]
pub struct StreamBuffers {
    /// Pending updates a subscriber may hold before new ones are dropped.
    pub subscriber: usize,
    /// Responses queued towards the caller.
    pub response: usize,
}

/// Starts a live vote-sum stream for `target` and returns the response stream
/// to hand back to tonic.
///
/// This performs the STARTING state: it registers a fresh subscriber channel,
/// spawns the watchdog bound to `call`, and spawns the forward loop. Both
/// tasks end after the single teardown, at which point the returned stream
/// finishes without an error.
///
/// The caller is responsible for any existence check on `target`.
pub fn spawn_vote_sum_stream(
    registry: &SubscriberRegistry,
    target: CryptoId,
    call: CallContext,
    buffers: StreamBuffers,
) -> ReceiverStream<Result<StreamVoteSumResponse, Status>> {
    let start = std::time::Instant::now();
    let (resp_tx, resp_rx) = mpsc::channel(buffers.response);
    let (subscription, rx) = Subscription::open(registry, target, buffers.subscriber);
    let subscriber = subscription.id();

    increment_streams_inflight();
    tracing::debug!(subscriber, id = %target, "Vote-sum stream registered");

    spawn_watchdog(subscription.clone(), call, resp_tx.clone());

    let fut = async move {
        let end = forward_vote_sums(subscription, rx, resp_tx).await;
        decrement_streams_inflight();
        record_stream_duration(start.elapsed().as_millis() as f64);
        tracing::debug!(?end, "Forward loop finished");
    };
    let span = tracing::info_span!("vote_sum_stream", subscriber, id = %target);
    tokio::spawn(fut.instrument(span));

    ReceiverStream::new(resp_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::broadcast::Broadcaster;
    use cryptovote_core::types::{Crypto, CryptoDraft, VoteCounter};
    use std::time::Duration;
    use tokio::time::{sleep, timeout};
    use tokio_stream::StreamExt;
    use tokio_util::sync::CancellationToken;

    const BUFFERS: StreamBuffers = StreamBuffers {
        subscriber: 16,
        response: 8,
    };

    async fn wait_until_empty(registry: &SubscriberRegistry) {
        timeout(Duration::from_secs(1), async {
            while !registry.is_empty() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("registry did not drain");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stream_sees_every_vote_and_ends_on_cancel() {
        let registry = SubscriberRegistry::new();
        let broadcaster = Broadcaster::new(registry.clone());
        let mut crypto = Crypto::new(CryptoId::generate(), CryptoDraft::new("Bitcoin", "BTC"));
        let call = CallContext::new(CancellationToken::new(), None);

        let mut stream = spawn_vote_sum_stream(&registry, crypto.id, call.clone(), BUFFERS);
        assert_eq!(registry.len(), 1);

        for counter in [VoteCounter::Upvotes; 4]
            .into_iter()
            .chain([VoteCounter::Downvotes; 2])
        {
            crypto.apply_vote(counter, 1);
            broadcaster.publish(&crypto);
        }

        let mut seen = Vec::new();
        while seen.len() < 6 {
            seen.push(stream.next().await.unwrap().unwrap().votes);
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 3, 2]);

        call.cancel();
        let rest = timeout(Duration::from_secs(1), stream.collect::<Vec<_>>())
            .await
            .unwrap();
        assert!(rest.is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn cancelled_stream_receives_nothing() {
        let registry = SubscriberRegistry::new();
        let broadcaster = Broadcaster::new(registry.clone());
        let mut crypto = Crypto::new(CryptoId::generate(), CryptoDraft::new("Cardano", "ADA"));
        let call = CallContext::new(CancellationToken::new(), None);

        let stream = spawn_vote_sum_stream(&registry, crypto.id, call.clone(), BUFFERS);
        call.cancel();
        wait_until_empty(&registry).await;

        crypto.apply_vote(VoteCounter::Upvotes, 1);
        broadcaster.publish(&crypto);

        let delivered: Vec<_> = stream.collect().await;
        assert!(delivered.is_empty());
    }

    #[tokio::test]
    async fn dropping_the_stream_unregisters() {
        let registry = SubscriberRegistry::new();
        let call = CallContext::new(CancellationToken::new(), None);

        let stream = spawn_vote_sum_stream(&registry, CryptoId::generate(), call, BUFFERS);
        assert_eq!(registry.len(), 1);

        drop(stream);
        wait_until_empty(&registry).await;
    }
}
