use crate::event::Event;

/// Common result alias for fallible session operations.
pub type Result<T> = std::result::Result<T, WSError>;

/// The error taxonomy surfaced at the session boundary.
///
/// Every variant here can reach user code; internal plumbing (building the
/// handshake request, resolving the upgrade) still uses `anyhow` and is
/// converted into [`WSError::Upgrade`] or [`WSError::NetworkError`] once it
/// crosses into session-owned state.
#[derive(Debug, thiserror::Error)]
pub enum WSError {
    /// The handshake did not return HTTP 101. No session was constructed.
    #[error("websocket upgrade failed: server responded with {}", .response.status)]
    Upgrade {
        /// The response headers and status returned by the server.
        response: http::response::Parts,
        /// The full response body, for servers that put a diagnostic
        /// message (an auth error page, for example) in a non-101 reply.
        body: bytes::Bytes,
    },

    /// The peer closed the connection, normally or abnormally.
    #[error("connection closed by peer: code={code} reason={reason:?}")]
    Disconnect {
        /// The close code the peer sent (or 1006/1005 for abnormal closure).
        code: u16,
        /// The close reason, empty if the peer didn't send one.
        reason: String,
    },

    /// A typed receive (`receive_text`, `receive_bytes`, `receive_json`)
    /// got a message of a different wire type. The session remains open;
    /// the caller may retry. The offending event is consumed, not re-queued.
    #[error("expected a different message type, got {event:?}")]
    InvalidTypeReceived {
        /// The event that was actually received.
        event: Event,
    },

    /// A stream read/write failure, a protocol violation surfaced by the
    /// underlying sansio engine, or a keepalive timeout. Fatal for the
    /// session: captured once and re-raised on every subsequent operation.
    #[error("websocket network error: {0}")]
    NetworkError(#[source] anyhow::Error),

    /// The caller's `receive` deadline elapsed before an event arrived.
    /// Non-fatal: the event queue is unaffected and the caller may retry.
    #[error("timed out waiting for a message")]
    Timeout,
}

impl WSError {
    pub(crate) fn network(err: impl Into<anyhow::Error>) -> Self {
        WSError::NetworkError(err.into())
    }
}
