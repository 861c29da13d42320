//! Registry of live vote-sum subscribers.
//!
//! The registry is the single source of truth for "who is listening". It owns
//! the sending half of every live subscriber channel and is shared (by cheap
//! clone) between the [`Broadcaster`] and the streaming handlers.
//!
//! ## Locking
//!
//! One mutex guards the subscriber list. It is held only for the structural
//! change itself (find, push, swap-remove) or for cloning the list pointer,
//! never across I/O or an `.await`.
//!
//! The list is copy-on-write: [`SubscriberRegistry::snapshot`] hands out an
//! `Arc` to the current list, and a later register/unregister copies the list
//! before changing it. Fan-out iterates a snapshot lock-free while concurrent
//! membership changes proceed.
//!
//! ## Ordering
//!
//! Removal is swap-with-last then truncate, so the order of the list is not
//! meaningful and nothing may depend on it.
//!
//! [`Broadcaster`]: super::broadcaster::Broadcaster

use core::fmt;
use cryptovote_core::types::Crypto;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Process-unique identity of one subscriber channel.
pub type SubscriberId = u64;

/// Outcome of a non-blocking delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The subscriber is behind; the update was dropped.
    Full,
    /// The subscriber already closed its receiving half.
    Closed,
}

/// The registry-side handle of a subscriber channel.
#[derive(Clone, Debug)]
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Crypto>,
}

impl Subscriber {
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Attempts to hand `crypto` to the subscriber without waiting.
    pub fn try_deliver(&self, crypto: &Crypto) -> Delivery {
        match self.tx.try_send(crypto.clone()) {
            Ok(()) => Delivery::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

struct Inner {
    subscribers: Mutex<Arc<Vec<Subscriber>>>,
    next_id: AtomicU64,
}

/// Shared, thread-safe set of live subscriber channels.
///
/// Cloning yields another handle to the same registry. Separate registries
/// (one per service instance or test) never share state.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<Inner>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(Arc::new(Vec::new())),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Creates a fresh subscriber channel with room for `capacity` pending
    /// updates. The channel is not registered yet.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn channel(&self, capacity: usize) -> (Subscriber, mpsc::Receiver<Crypto>) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        (Subscriber { id, tx }, rx)
    }

    /// Adds `subscriber`. Returns `false` if a channel with the same id is
    /// already registered, in which case nothing changes.
    pub fn register(&self, subscriber: Subscriber) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        if subscribers.iter().any(|s| s.id == subscriber.id) {
            return false;
        }
        Arc::make_mut(&mut subscribers).push(subscriber);
        true
    }

    /// Removes the channel with `id`. Unknown ids and repeated calls are
    /// silent no-ops that return `false`.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let Some(index) = subscribers.iter().position(|s| s.id == id) else {
            return false;
        };
        Arc::make_mut(&mut subscribers).swap_remove(index);
        true
    }

    /// The current members, immune to later register/unregister calls.
    pub fn snapshot(&self) -> Arc<Vec<Subscriber>> {
        Arc::clone(&self.inner.subscribers.lock())
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.lock().iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}
