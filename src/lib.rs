//! A client-side WebSocket session library layered on top of a plain
//! HTTP/1.1 Upgrade handshake.
//!
//! [`connect`] dials a server and hands back a [`Session`]: a handle for
//! sending text/binary/JSON messages, pinging the peer, and draining a
//! backpressured event queue fed by a background receive pump. Everything
//! here is generic over any [`WsIo`](stream::WsIo) stream, so tests can
//! swap in an in-memory duplex instead of a real socket.
//!
//! For callers outside an async context, [`blocking::BlockingSession`]
//! wraps the same engine behind a dedicated background runtime.

mod blocking;
mod config;
mod connect;
mod error;
mod event;
mod ping;
mod protocol;
mod pumps;
mod session;
mod signal;
mod stream;

pub use blocking::{connect as connect_blocking, BlockingSession};
pub use config::{ConnectConfig, SessionConfig};
pub use connect::{connect, connect_with_io};
pub use error::{Result, WSError};
pub use event::{Event, JsonMode};
pub use session::Session;
pub use signal::Signal;
pub use stream::WsIo;
