use crate::server::broadcast::{SubscriberId, SubscriberRegistry};
use cryptovote_core::types::{Crypto, CryptoId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One registered vote-sum stream.
///
/// Shared between the forward loop and the watchdog of a single call. Either
/// side may end the subscription through [`Subscription::teardown`], which
/// unregisters the channel exactly once and then signals [`closed`]. The
/// forward loop owns the receiving half and closes it only after observing
/// that signal (or after calling `teardown` itself), so a channel is never
/// closed while still registered.
///
/// Dropping the last handle tears the subscription down as well.
///
/// [`closed`]: Subscription::closed
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    target: CryptoId,
    registry: SubscriberRegistry,
    torn_down: AtomicBool,
    closed: CancellationToken,
}

impl Subscription {
    /// Creates and registers a fresh channel for updates about `target`.
    pub fn open(
        registry: &SubscriberRegistry,
        target: CryptoId,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Crypto>) {
        let (subscriber, rx) = registry.channel(capacity);
        let id = subscriber.id();
        registry.register(subscriber);

        let subscription = Self {
            id,
            target,
            registry: registry.clone(),
            torn_down: AtomicBool::new(false),
            closed: CancellationToken::new(),
        };
        (Arc::new(subscription), rx)
    }

    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    pub const fn target(&self) -> CryptoId {
        self.target
    }

    /// Unregisters the channel, then signals [`Subscription::closed`].
    ///
    /// Returns `true` for the one call that performed the teardown and
    /// `false` for every later call.
    pub fn teardown(&self) -> bool {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.registry.unregister(self.id);
        self.closed.cancel();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the subscription has been torn down.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown();
    }
}
