use super::registry::{Delivery, SubscriberRegistry};
use crate::server::telemetry::{increment_deliveries, increment_deliveries_dropped};
use cryptovote_core::types::Crypto;

/// Best-effort fan-out of mutated records to every registered subscriber.
///
/// [`Broadcaster::publish`] never waits: a subscriber whose channel is full
/// (or already closed) simply misses the update. Subscribers must tolerate
/// gaps; the current value is always available from the store.
#[derive(Clone)]
pub struct Broadcaster {
    registry: SubscriberRegistry,
}

impl Broadcaster {
    pub const fn new(registry: SubscriberRegistry) -> Self {
        Self { registry }
    }

    pub const fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Offers a copy of `crypto` to every subscriber registered right now.
    ///
    /// Runs in time proportional to the number of subscribers, independent of
    /// how quickly any of them drains its channel.
    pub fn publish(&self, crypto: &Crypto) {
        let subscribers = self.registry.snapshot();
        let mut delivered = 0_u64;
        let mut dropped = 0_u64;

        for subscriber in subscribers.iter() {
            match subscriber.try_deliver(crypto) {
                Delivery::Delivered => delivered += 1,
                Delivery::Full | Delivery::Closed => dropped += 1,
            }
        }

        increment_deliveries(delivered);
        increment_deliveries_dropped(dropped);
        tracing::trace!(
            id = %crypto.id,
            votes = crypto.vote_sum(),
            delivered,
            dropped,
            "published vote update"
        );
    }
}
