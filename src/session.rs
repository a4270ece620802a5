use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fastwebsockets::{FragmentCollectorRead, WebSocketWrite};
use futures_util::lock::Mutex as AsyncMutex;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::SessionConfig;
use crate::error::{Result, WSError};
use crate::event::{Event, JsonMode};
use crate::ping::PingManager;
use crate::protocol::{frame_for_event, ping_frame};
use crate::pumps::{keepalive, receive};
use crate::signal::Signal;
use crate::stream::{SharedWriteHalf, WsIo};

/// State shared between the Session Facade and both background pumps.
/// Pumps never reach into the facade directly; they only flip `closed`,
/// record a terminal error, and wake waiters through `close_notify`.
pub(crate) struct Shared<S: WsIo> {
    write: AsyncMutex<WebSocketWrite<SharedWriteHalf<WriteHalf<S>>>>,
    shutdown_handle: Arc<TokioMutex<WriteHalf<S>>>,
    ping_mgr: PingManager,
    closed: AtomicBool,
    terminal_error: parking_lot::Mutex<Option<Arc<str>>>,
    close_notify: tokio::sync::Notify,
}

impl<S: WsIo> Shared<S> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.close_notify.notify_waiters();
        }
    }

    pub(crate) fn set_terminal_error(&self, message: impl Into<Arc<str>>) {
        let mut guard = self.terminal_error.lock();
        if guard.is_none() {
            *guard = Some(message.into());
        }
    }

    fn take_terminal_error(&self) -> Option<WSError> {
        self.terminal_error
            .lock()
            .clone()
            .map(|message| WSError::NetworkError(anyhow::anyhow!(message.to_string())))
    }

    pub(crate) fn ping_manager(&self) -> &PingManager {
        &self.ping_mgr
    }

    pub(crate) async fn write_frame(&self, frame: fastwebsockets::Frame<'_>) -> Result<()> {
        self.write
            .lock()
            .await
            .write_frame(frame)
            .await
            .map_err(WSError::network)
    }

    pub(crate) async fn wait_for_close(&self) {
        if !self.is_closed() {
            self.close_notify.notified().await;
        }
    }

    /// Shuts down the write half of the underlying stream. Idempotent:
    /// `AsyncWriteExt::shutdown` on an already-shut-down half returns an
    /// error, which is swallowed here.
    async fn shutdown_stream(&self) {
        let mut guard = self.shutdown_handle.lock().await;
        if guard.shutdown().await.is_err() {
            trace!("stream shutdown failed, socket likely already closed");
        }
    }
}

/// The async session facade: the user-visible send/receive/ping/close
/// operations, backed by a receive pump and an optional keepalive pump
/// that run as cooperatively scheduled tasks alongside user code.
///
/// See [`crate::blocking::BlockingSession`] for the thread-driven flavor,
/// which shares this exact type as its inner engine.
pub struct Session<S: WsIo> {
    pub(crate) shared: Arc<Shared<S>>,
    queue_rx: async_channel::Receiver<Event>,
    recv_handle: Option<JoinHandle<()>>,
    keepalive_handle: Option<JoinHandle<()>>,
    subprotocol: Option<String>,
}

impl<S: WsIo> Session<S> {
    /// Builds a session around an already-upgraded stream. Spawns the
    /// receive pump and, if configured, the keepalive pump. `ws_rx`/`ws_tx`
    /// are the already-split, already-configured halves of the same
    /// `WebSocket<S>` the handshake produced: splitting (and wrapping the
    /// read half in a [`FragmentCollectorRead`]) happens in the connector
    /// since that's also where `max_message_size_bytes` is applied.
    /// `shutdown_handle` reaches the same write half as `ws_tx` through a
    /// shared lock, so `close()` can shut the stream down directly
    /// without needing an accessor back out of `ws_tx`.
    pub(crate) fn spawn(
        ws_rx: FragmentCollectorRead<ReadHalf<S>>,
        ws_tx: WebSocketWrite<SharedWriteHalf<WriteHalf<S>>>,
        shutdown_handle: Arc<TokioMutex<WriteHalf<S>>>,
        config: SessionConfig,
        subprotocol: Option<String>,
    ) -> Self {
        let shared = Arc::new(Shared {
            write: AsyncMutex::new(ws_tx),
            shutdown_handle,
            ping_mgr: PingManager::new(),
            closed: AtomicBool::new(false),
            terminal_error: parking_lot::Mutex::new(None),
            close_notify: tokio::sync::Notify::new(),
        });

        let (tx, rx) = async_channel::bounded(config.queue_capacity);

        let recv_handle = tokio::spawn(receive::run(ws_rx, shared.clone(), tx));

        let keepalive_handle = config.keepalive_ping_interval.map(|interval| {
            tokio::spawn(keepalive::run(shared.clone(), interval, config.keepalive_ping_timeout))
        });

        Session {
            shared,
            queue_rx: rx,
            recv_handle: Some(recv_handle),
            keepalive_handle,
            subprotocol,
        }
    }

    /// The subprotocol negotiated during the handshake, if any.
    pub fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }

    /// Encodes `event` and writes it to the stream.
    pub async fn send(&self, event: Event) -> Result<()> {
        self.fail_if_terminal()?;
        let frame = frame_for_event(event);
        self.shared.write_frame(frame).await
    }

    /// Sends a text message.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Event::Text(text.into())).await
    }

    /// Sends a binary message.
    pub async fn send_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.send(Event::Bytes(bytes.into())).await
    }

    /// Serializes `value` to JSON and sends it as text or binary.
    pub async fn send_json<T: serde::Serialize>(&self, value: &T, mode: JsonMode) -> Result<()> {
        let payload = serde_json::to_vec(value).map_err(WSError::network)?;
        match mode {
            JsonMode::Text => {
                let text = String::from_utf8(payload).map_err(WSError::network)?;
                self.send_text(text).await
            }
            JsonMode::Binary => self.send_bytes(payload).await,
        }
    }

    /// Allocates a ping payload (random if empty), sends a Ping frame, and
    /// returns the signal that resolves when the matching Pong arrives or
    /// the session closes.
    pub async fn ping(&self, payload: impl Into<Bytes>) -> Result<Signal> {
        self.fail_if_terminal()?;
        let (id, signal) = self.shared.ping_manager().create(payload.into());
        debug!(payload = ?id, "sending ping");
        self.shared.write_frame(ping_frame(id.to_vec())).await?;
        Ok(signal)
    }

    /// Dequeues one event, or fails if the session is closing/closed, the
    /// peer disconnected, or `timeout` elapsed.
    pub async fn receive(&self, timeout: Option<Duration>) -> Result<Event> {
        let recv_fut = self.queue_rx.recv();
        let event = match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, recv_fut).await {
                Ok(result) => result,
                Err(_) => return Err(WSError::Timeout),
            },
            None => recv_fut.await,
        };

        match event {
            Ok(Event::Close { code, reason }) => Err(WSError::Disconnect { code, reason }),
            Ok(event) => Ok(event),
            // The queue sender was dropped, meaning the receive pump exited
            // without ever observing a CloseConnection frame: a read/write
            // failure closed it instead, and that failure is the terminal
            // error we should surface.
            Err(_queue_closed) => Err(self
                .shared
                .take_terminal_error()
                .unwrap_or(WSError::Disconnect { code: 1006, reason: String::new() })),
        }
    }

    /// `receive` asserting the event is a [`Event::Text`]; consumes the
    /// event regardless of its actual type.
    pub async fn receive_text(&self, timeout: Option<Duration>) -> Result<String> {
        match self.receive(timeout).await? {
            Event::Text(text) => Ok(text),
            other => Err(WSError::InvalidTypeReceived { event: other }),
        }
    }

    /// `receive` asserting the event is a [`Event::Bytes`]; consumes the
    /// event regardless of its actual type.
    pub async fn receive_bytes(&self, timeout: Option<Duration>) -> Result<Vec<u8>> {
        match self.receive(timeout).await? {
            Event::Bytes(bytes) => Ok(bytes),
            other => Err(WSError::InvalidTypeReceived { event: other }),
        }
    }

    /// `receive` + JSON parse, in the given [`JsonMode`].
    pub async fn receive_json<T: serde::de::DeserializeOwned>(
        &self,
        timeout: Option<Duration>,
        mode: JsonMode,
    ) -> Result<T> {
        match mode {
            JsonMode::Text => {
                let text = self.receive_text(timeout).await?;
                serde_json::from_str(&text).map_err(WSError::network)
            }
            JsonMode::Binary => {
                let bytes = self.receive_bytes(timeout).await?;
                serde_json::from_slice(&bytes).map_err(WSError::network)
            }
        }
    }

    /// Closes the session: sends the CloseConnection frame (best-effort,
    /// a write error here is swallowed since the peer may already be
    /// gone), joins the receive pump, joins the keepalive pump, and shuts
    /// down the underlying stream. Idempotent with a concurrent
    /// pump-initiated close (a dead-peer timeout or a read error): the
    /// close flag is only flipped once, so this never double-sends the
    /// close frame even if a pump got there first, and calling `close`
    /// again afterward just re-joins the (already finished) pumps and
    /// re-attempts the stream shutdown, which is itself idempotent.
    pub async fn close(&mut self, code: u16, reason: Option<String>) -> Result<()> {
        let already_closing = self.shared.closed.swap(true, Ordering::AcqRel);
        self.shared.close_notify.notify_waiters();

        if !already_closing {
            let frame = frame_for_event(Event::Close { code, reason: reason.unwrap_or_default() });
            if self.shared.write_frame(frame).await.is_err() {
                trace!("close frame write failed, peer likely already gone");
            }
        }

        if let Some(handle) = self.recv_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.keepalive_handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.shared.ping_manager().drain();
        self.shared.shutdown_stream().await;
        Ok(())
    }

    fn fail_if_terminal(&self) -> Result<()> {
        if let Some(err) = self.shared.take_terminal_error() {
            return Err(err);
        }
        Ok(())
    }
}

impl<S: WsIo> Drop for Session<S> {
    fn drop(&mut self) {
        self.shared.mark_closed();
        if let Some(handle) = self.recv_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.keepalive_handle.take() {
            handle.abort();
        }
        self.shared.ping_manager().drain();
    }
}
