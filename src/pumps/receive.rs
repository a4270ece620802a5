use std::sync::Arc;

use fastwebsockets::{FragmentCollectorRead, OpCode};
use tokio::io::ReadHalf;

use crate::event::Event;
use crate::protocol::event_for_frame;
use crate::session::Shared;
use crate::stream::WsIo;

/// The Receive Pump: runs exactly once per session, from construction
/// until the close flag is set or a stream error occurs.
///
/// `ws_rx` already reassembles fragmented frames into complete messages
/// and enforces `max_message_size_bytes` (see [`crate::session::Session::spawn`]).
/// Ping replies are written automatically through the `send_fn` closure
/// `read_frame` invokes before this loop ever sees the frame, so a Ping
/// never needs to be handled here beyond not enqueuing it.
pub(crate) async fn run<S: WsIo>(
    mut ws_rx: FragmentCollectorRead<ReadHalf<S>>,
    shared: Arc<Shared<S>>,
    tx: async_channel::Sender<Event>,
) {
    loop {
        let read = ws_rx.read_frame(&mut |frame| {
            let shared = &shared;
            async move { shared.write_frame(frame).await }
        });

        // A concurrent `close()` notifies waiters immediately; racing the
        // read against it means an idle pump stops as soon as the user
        // closes, instead of waiting for the peer to send more bytes.
        let frame = tokio::select! {
            frame = read => frame,
            _ = shared.wait_for_close() => return,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                tracing::trace!(error = %err, "receive pump stopped: read failed");
                shared.set_terminal_error(err.to_string());
                shared.mark_closed();
                shared.ping_manager().drain();
                return;
            }
        };

        match frame.opcode {
            // The Pong reply was already written by the `send_fn` closure
            // above; nothing left to do but keep reading.
            OpCode::Ping => continue,
            OpCode::Pong => {
                shared.ping_manager().ack(frame.payload.as_ref());
            }
            OpCode::Close => {
                let payload = frame.payload.as_ref().to_vec();
                let event = match event_for_frame(OpCode::Close, payload) {
                    Ok(event) => event,
                    Err(_) => Event::Close { code: 1000, reason: String::new() },
                };
                shared.mark_closed();
                let _ = tx.send(event).await;
                shared.ping_manager().drain();
                return;
            }
            OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                let payload = frame.payload.as_ref().to_vec();
                match event_for_frame(frame.opcode, payload) {
                    Ok(event) => {
                        // Backpressure: a full queue suspends this await,
                        // which in turn pauses further reads from the
                        // stream.
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(_) => {
                        shared.set_terminal_error("received a text frame that was not valid UTF-8");
                        shared.mark_closed();
                        shared.ping_manager().drain();
                        return;
                    }
                }
            }
        }
    }
}
