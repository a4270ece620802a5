use std::time::Duration;

/// Default cap on a single `stream.read()` chunk. Accepted for API
/// parity with callers that expect to tune it; the underlying engine
/// manages its own internal read buffer and does not expose a per-read
/// chunk size, so this knob is currently advisory only.
pub const DEFAULT_MAX_RECEIVE_CHUNK_BYTES: usize = 65_536;
/// Default cap on a fully reassembled decoded message.
pub const DEFAULT_MAX_MESSAGE_SIZE_BYTES: usize = 65_536;
/// Default bound on the event queue, applying backpressure to the
/// receive pump once a caller falls behind on draining it.
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;
/// Default keepalive ping interval.
pub const DEFAULT_KEEPALIVE_PING_INTERVAL: Duration = Duration::from_secs(20);
/// Default keepalive Pong deadline.
pub const DEFAULT_KEEPALIVE_PING_TIMEOUT: Duration = Duration::from_secs(20);

/// Knobs governing a [`crate::session::Session`]'s runtime behavior, set
/// once at `connect()` time. There is no file or CLI-driven configuration
/// surface in this crate; this is a plain builder holding the dial
/// settings a session is constructed with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) max_receive_chunk_bytes: usize,
    pub(crate) max_message_size_bytes: usize,
    pub(crate) queue_capacity: usize,
    pub(crate) keepalive_ping_interval: Option<Duration>,
    pub(crate) keepalive_ping_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_receive_chunk_bytes: DEFAULT_MAX_RECEIVE_CHUNK_BYTES,
            max_message_size_bytes: DEFAULT_MAX_MESSAGE_SIZE_BYTES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            keepalive_ping_interval: Some(DEFAULT_KEEPALIVE_PING_INTERVAL),
            keepalive_ping_timeout: DEFAULT_KEEPALIVE_PING_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the max size of a single `stream.read()` chunk.
    pub fn with_max_receive_chunk_bytes(mut self, bytes: usize) -> Self {
        self.max_receive_chunk_bytes = bytes;
        self
    }

    /// Sets the max size of a fully reassembled decoded message. The
    /// underlying engine rejects anything larger as a protocol error.
    pub fn with_max_message_size_bytes(mut self, bytes: usize) -> Self {
        self.max_message_size_bytes = bytes;
        self
    }

    /// Sets the bound on the event queue. A full queue applies
    /// backpressure: the receive pump suspends on enqueue until the user
    /// drains events.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the keepalive ping interval. `None` disables the keepalive
    /// pump entirely.
    pub fn with_keepalive_ping_interval(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_ping_interval = interval;
        self
    }

    /// Sets how long the keepalive pump waits for a Pong before declaring
    /// the peer dead.
    pub fn with_keepalive_ping_timeout(mut self, timeout: Duration) -> Self {
        self.keepalive_ping_timeout = timeout;
        self
    }
}

/// Parameters for the Upgrade handshake itself, layered on top of a
/// [`SessionConfig`] for the session it produces.
#[derive(Debug, Clone, Default)]
pub struct ConnectConfig {
    pub(crate) session: SessionConfig,
    pub(crate) subprotocols: Vec<String>,
    pub(crate) headers: Vec<(String, String)>,
}

impl ConnectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Adds `sec-websocket-protocol: <csv>` with these candidates.
    pub fn with_subprotocols(mut self, subprotocols: Vec<String>) -> Self {
        self.subprotocols = subprotocols;
        self
    }

    /// Extra request headers sent with the Upgrade GET.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}
