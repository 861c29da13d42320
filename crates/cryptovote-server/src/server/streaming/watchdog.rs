use super::{
    context::{CallContext, CallEnd},
    subscription::Subscription,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};

/// What woke the watchdog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogTrigger {
    /// The call was cancelled or ran past its deadline.
    Call(CallEnd),
    /// The caller dropped its response stream.
    Disconnected,
    /// The forward loop had already torn the subscription down.
    AlreadyClosed,
}

/// Waits for the end of the call that owns `subscription` and tears the
/// subscription down.
///
/// The watchdog reacts to the first of:
///
/// - the call's cancellation token (per-call cancel or service shutdown),
/// - the call's deadline,
/// - `sink` being closed because tonic dropped the response stream,
/// - the subscription being torn down by its forward loop.
///
/// `sink` is only observed, never written to. Holding it keeps the response
/// stream open until the watchdog exits, which happens right after teardown.
pub async fn watch<T>(
    subscription: Arc<Subscription>,
    call: CallContext,
    sink: mpsc::Sender<T>,
) -> WatchdogTrigger {
    let trigger = tokio::select! {
        biased;
        () = subscription.closed() => WatchdogTrigger::AlreadyClosed,
        end = call.done() => WatchdogTrigger::Call(end),
        () = sink.closed() => WatchdogTrigger::Disconnected,
    };

    if trigger != WatchdogTrigger::AlreadyClosed && subscription.teardown() {
        tracing::debug!(
            subscriber = subscription.id(),
            id = %subscription.target(),
            ?trigger,
            "Vote-sum stream ended"
        );
    }
    trigger
}

/// Spawns [`watch`] on the current runtime.
pub fn spawn_watchdog<T>(
    subscription: Arc<Subscription>,
    call: CallContext,
    sink: mpsc::Sender<T>,
) -> JoinHandle<WatchdogTrigger>
where
    T: Send + 'static,
{
    tokio::spawn(watch(subscription, call, sink))
}
