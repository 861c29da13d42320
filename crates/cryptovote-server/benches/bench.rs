use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use cryptovote_core::types::{Crypto, CryptoDraft, CryptoId, VoteCounter};
use cryptovote_server::server::{
    broadcast::{Broadcaster, SubscriberRegistry},
    streaming::{CallContext, StreamBuffers, spawn_vote_sum_stream},
};
use std::time::{Duration, Instant};
use tokio::{runtime::Builder, sync::mpsc};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

const SUBSCRIBER_CASES: [usize; 4] = [1, 16, 256, 4096];

fn sample() -> Crypto {
    Crypto::new(CryptoId::generate(), CryptoDraft::new("Bitcoin", "BTC"))
}

fn subscribe(
    registry: &SubscriberRegistry,
    n: usize,
    capacity: usize,
) -> Vec<mpsc::Receiver<Crypto>> {
    (0..n)
        .map(|_| {
            let (subscriber, rx) = registry.channel(capacity);
            registry.register(subscriber);
            rx
        })
        .collect()
}

/// Publish to subscribers that always have room. Draining is not timed.
fn publish_ready(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast/publish_ready");

    for &n in &SUBSCRIBER_CASES {
        let registry = SubscriberRegistry::new();
        let broadcaster = Broadcaster::new(registry.clone());
        let mut receivers = subscribe(&registry, n, 1);
        let crypto = sample();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("subscribers/{n}"), |b| {
            b.iter_custom(|iters| {
                let mut elapsed = Duration::ZERO;
                for _ in 0..iters {
                    let start = Instant::now();
                    broadcaster.publish(black_box(&crypto));
                    elapsed += start.elapsed();

                    for rx in &mut receivers {
                        black_box(rx.try_recv().ok());
                    }
                }
                elapsed
            });
        });
    }

    group.finish();
}

/// Publish to subscribers whose buffers are full, so every delivery drops.
fn publish_stalled(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast/publish_stalled");

    for &n in &SUBSCRIBER_CASES {
        let registry = SubscriberRegistry::new();
        let broadcaster = Broadcaster::new(registry.clone());
        let _receivers = subscribe(&registry, n, 1);
        let crypto = sample();
        broadcaster.publish(&crypto);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("subscribers/{n}"), |b| {
            b.iter(|| broadcaster.publish(black_box(&crypto)));
        });
    }

    group.finish();
}

/// Vote to vote-sum latency through a live stream.
fn stream_round_trip(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    let mut group = c.benchmark_group("streaming/round_trip");

    group.bench_function("single_stream", |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let registry = SubscriberRegistry::new();
            let broadcaster = Broadcaster::new(registry.clone());
            let mut crypto = sample();
            let call = CallContext::new(CancellationToken::new(), None);
            let buffers = StreamBuffers {
                subscriber: 16,
                response: 8,
            };
            let mut stream = spawn_vote_sum_stream(&registry, crypto.id, call.clone(), buffers);

            let start = Instant::now();
            for _ in 0..iters {
                crypto.apply_vote(VoteCounter::Upvotes, 1);
                broadcaster.publish(&crypto);
                black_box(stream.next().await);
            }
            let elapsed = start.elapsed();

            call.cancel();
            elapsed
        });
    });

    group.finish();
}

criterion_group!(benches, publish_ready, publish_stalled, stream_round_trip);
criterion_main!(benches);
