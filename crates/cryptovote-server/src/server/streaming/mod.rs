//! Live vote-sum streams.
//!
//! Each `StreamVoteSum` call runs as two tasks sharing one [`Subscription`]:
//!
//! - the forward loop ([`forwarder`]) filters broadcast updates down to the
//!   requested record and sends vote sums to the caller;
//! - the watchdog ([`watchdog`]) waits for the call to end (cancel, deadline,
//!   disconnect, shutdown) and triggers teardown.
//!
//! ## State machine
//!
//! `STARTING` ([`coordinator`]) → `FILTERING` ([`forwarder`]) → `CLOSING`
//! ([`Subscription::teardown`]) → `CLOSED` (both tasks exit, the response
//! stream ends without an error).

pub mod context;
pub mod coordinator;
pub mod forwarder;
pub mod subscription;
pub mod watchdog;

pub use context::{CallContext, CallEnd};
pub use coordinator::{StreamBuffers, spawn_vote_sum_stream};
pub use forwarder::StreamEnd;
pub use subscription::Subscription;
pub use watchdog::WatchdogTrigger;
