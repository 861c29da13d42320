//! Process-local publish/subscribe for vote updates.
//!
//! - [`registry`] - The injected set of live subscriber channels.
//! - [`broadcaster`] - Lossy, non-blocking fan-out over a registry snapshot.

pub mod broadcaster;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use registry::{Delivery, Subscriber, SubscriberId, SubscriberRegistry};
