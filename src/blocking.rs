use std::time::Duration;

use bytes::Bytes;

use crate::config::ConnectConfig;
use crate::error::Result;
use crate::event::{Event, JsonMode};
use crate::session::Session;
use crate::signal::Signal;
use crate::stream::WsIo;

/// Thread-driven flavor of [`Session`], for callers outside an async
/// context. Owns a dedicated Tokio runtime with its own worker
/// thread and blocks the calling thread on it for every call; the async
/// [`Session`] underneath is unmodified, so both facades share the
/// identical protocol adapter, ping manager, and pump implementation.
///
/// The runtime needs its own worker thread rather than being driven only
/// from inside each call's `block_on`: the receive and keepalive pumps
/// are long-lived background tasks that must keep making progress
/// (reassembling frames, timing out a dead peer) even while the caller
/// is off doing something else between calls.
pub struct BlockingSession<S: WsIo> {
    runtime: tokio::runtime::Runtime,
    inner: Session<S>,
}

impl<S: WsIo> BlockingSession<S> {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, inner: Session<S>) -> Self {
        BlockingSession { runtime, inner }
    }

    /// The subprotocol negotiated during the handshake, if any.
    pub fn subprotocol(&self) -> Option<&str> {
        self.inner.subprotocol()
    }

    pub fn send(&self, event: Event) -> Result<()> {
        self.runtime.block_on(self.inner.send(event))
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.runtime.block_on(self.inner.send_text(text))
    }

    pub fn send_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.runtime.block_on(self.inner.send_bytes(bytes))
    }

    pub fn send_json<T: serde::Serialize>(&self, value: &T, mode: JsonMode) -> Result<()> {
        self.runtime.block_on(self.inner.send_json(value, mode))
    }

    /// Sends a Ping and returns a [`Signal`]; call [`Signal::wait_blocking`]
    /// on it from this same thread to block for the matching Pong.
    pub fn ping(&self, payload: impl Into<Bytes>) -> Result<Signal> {
        self.runtime.block_on(self.inner.ping(payload))
    }

    pub fn receive(&self, timeout: Option<Duration>) -> Result<Event> {
        self.runtime.block_on(self.inner.receive(timeout))
    }

    pub fn receive_text(&self, timeout: Option<Duration>) -> Result<String> {
        self.runtime.block_on(self.inner.receive_text(timeout))
    }

    pub fn receive_bytes(&self, timeout: Option<Duration>) -> Result<Vec<u8>> {
        self.runtime.block_on(self.inner.receive_bytes(timeout))
    }

    pub fn receive_json<T: serde::de::DeserializeOwned>(
        &self,
        timeout: Option<Duration>,
        mode: JsonMode,
    ) -> Result<T> {
        self.runtime.block_on(self.inner.receive_json(timeout, mode))
    }

    pub fn close(&mut self, code: u16, reason: Option<String>) -> Result<()> {
        self.runtime.block_on(self.inner.close(code, reason))
    }
}

/// Dials `url` and returns a [`BlockingSession`] backed by a freshly spun
/// runtime (one worker thread) dedicated to this one session.
pub fn connect(
    url: &str,
    config: ConnectConfig,
) -> Result<BlockingSession<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(crate::error::WSError::network)?;

    let session = runtime.block_on(crate::connect::connect(url, config))?;
    Ok(BlockingSession::new(runtime, session))
}
