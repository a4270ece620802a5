use std::time::Duration;

use tokio::sync::oneshot;

/// A one-shot, waitable object that transitions exactly once from pending
/// to resolved. Resolved `true` ("satisfied") when the matching Pong
/// arrives, resolved `false` ("unsatisfied") when the session closes or
/// the waiter's resolver is dropped without ever firing.
///
/// Usable from both session flavors: the async facade awaits it directly;
/// the blocking facade, which never calls it from inside the background
/// runtime thread, calls [`Signal::wait_blocking`].
pub struct Signal {
    rx: oneshot::Receiver<bool>,
}

pub(crate) type SignalResolver = oneshot::Sender<bool>;

impl Signal {
    pub(crate) fn pair() -> (SignalResolver, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Signal { rx })
    }

    /// Waits until the signal resolves. Never panics: a dropped resolver
    /// (e.g. the session was torn down mid-wait) resolves as unsatisfied.
    pub async fn wait(self) -> bool {
        self.rx.await.unwrap_or(false)
    }

    /// Waits up to `timeout`. Returns `Ok(satisfied)` if the signal
    /// resolved in time, `Err(())` on timeout (the signal keeps living and
    /// may still be awaited again isn't supported once consumed here).
    pub async fn wait_timeout(self, timeout: Duration) -> Result<bool, ()> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(resolved) => Ok(resolved.unwrap_or(false)),
            Err(_) => Err(()),
        }
    }

    /// Blocking variant of [`Signal::wait`]. Must be called from a thread
    /// that is not itself driving a Tokio runtime.
    pub fn wait_blocking(self) -> bool {
        self.rx.blocking_recv().unwrap_or(false)
    }
}
