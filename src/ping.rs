use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::Mutex;
use rand::RngCore;

use crate::signal::Signal;

/// Maps outstanding ping payloads to the signal that resolves when the
/// matching Pong arrives.
///
/// Shared between the Receive Pump (`ack`), the Keepalive Pump
/// (`create` + wait), and the Session Facade (`create` via user `ping()`).
/// All mutation is serialized through a single mutex; critical sections
/// never hold the lock across an `.await`.
#[derive(Default)]
pub(crate) struct PingManager {
    outstanding: Mutex<HashMap<Bytes, crate::signal::SignalResolver>>,
}

impl PingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an identifier (generating 4 random bytes if `payload` is
    /// empty, retrying on the rare collision) and registers a fresh signal
    /// for it.
    pub fn create(&self, payload: Bytes) -> (Bytes, Signal) {
        let mut outstanding = self.outstanding.lock();

        let id = if payload.is_empty() {
            loop {
                let mut buf = [0u8; 4];
                rand::thread_rng().fill_bytes(&mut buf);
                let candidate = Bytes::copy_from_slice(&buf);
                if !outstanding.contains_key(&candidate) {
                    break candidate;
                }
            }
        } else {
            payload
        };

        let (resolver, signal) = Signal::pair();
        outstanding.insert(id.clone(), resolver);
        (id, signal)
    }

    /// Resolves the signal for `id` as satisfied and forgets it. A Pong
    /// for an unknown identifier is ignored (it may belong to a
    /// peer-initiated exchange).
    pub fn ack(&self, id: &[u8]) {
        if let Some(resolver) = self.outstanding.lock().remove(id) {
            let _ = resolver.send(true);
        }
    }

    /// Resolves every outstanding signal as unsatisfied and clears the
    /// map. Called once the session is closing so no waiter blocks
    /// forever.
    pub fn drain(&self) {
        let mut outstanding = self.outstanding.lock();
        for (_, resolver) in outstanding.drain() {
            let _ = resolver.send(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ack_resolves_matching_signal_satisfied() {
        let mgr = PingManager::new();
        let (id, signal) = mgr.create(Bytes::new());
        mgr.ack(&id);
        assert!(signal.wait().await);
    }

    #[tokio::test]
    async fn ack_on_unknown_id_is_ignored() {
        let mgr = PingManager::new();
        let (_id, signal) = mgr.create(Bytes::from_static(b"abcd"));
        mgr.ack(b"zzzz");
        mgr.drain();
        assert!(!signal.wait().await);
    }

    #[tokio::test]
    async fn drain_resolves_outstanding_signals_unsatisfied() {
        let mgr = PingManager::new();
        let (_id1, s1) = mgr.create(Bytes::new());
        let (_id2, s2) = mgr.create(Bytes::new());
        mgr.drain();
        assert!(!s1.wait().await);
        assert!(!s2.wait().await);
    }

    #[test]
    fn empty_payload_allocates_unique_four_byte_ids() {
        let mgr = PingManager::new();
        let (id1, _s1) = mgr.create(Bytes::new());
        let (id2, _s2) = mgr.create(Bytes::new());
        assert_eq!(id1.len(), 4);
        assert_eq!(id2.len(), 4);
        assert_ne!(id1, id2);
    }
}
