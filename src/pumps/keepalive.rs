use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::protocol::ping_frame;
use crate::session::Shared;
use crate::stream::WsIo;

/// The Keepalive Pump: issues a Ping every `interval` and requires the
/// matching Pong within `timeout`, independent of the event queue's
/// backpressure (Pongs are consumed here, never by the queue).
pub(crate) async fn run<S: WsIo>(shared: Arc<Shared<S>>, interval: Duration, timeout: Duration) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shared.wait_for_close() => return,
        }

        let (id, signal) = shared.ping_manager().create(Bytes::new());
        debug!(payload = ?id, "keepalive: sending ping");

        if shared.write_frame(ping_frame(id.to_vec())).await.is_err() {
            shared.set_terminal_error("keepalive: failed to write ping frame");
            shared.mark_closed();
            shared.ping_manager().drain();
            return;
        }

        match signal.wait_timeout(timeout).await {
            Ok(true) => continue,
            Ok(false) | Err(()) => {
                warn!("keepalive: peer did not respond to ping within the deadline");
                shared.set_terminal_error(
                    "keepalive ping timed out: peer did not respond with a pong",
                );
                shared.mark_closed();
                shared.ping_manager().drain();
                return;
            }
        }
    }
}
