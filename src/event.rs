/// A decoded application-level WebSocket event.
///
/// Ping and Pong never reach this type: they're consumed by the receive
/// pump and the ping manager respectively (see [`crate::ping`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A complete text message.
    Text(String),
    /// A complete binary message.
    Bytes(Vec<u8>),
    /// The peer initiated (or acknowledged) connection close.
    Close {
        /// Close code, forwarded verbatim even outside the standard range.
        code: u16,
        /// Close reason, empty string if none was sent.
        reason: String,
    },
}

impl Event {
    /// Returns the text payload, if this is a [`Event::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Event::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the binary payload, if this is a [`Event::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Event::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Encoding used by `send_json`/`receive_json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonMode {
    /// Serialize/parse the JSON payload as a text message.
    Text,
    /// Serialize/parse the JSON payload as a UTF-8-encoded binary message.
    Binary,
}
