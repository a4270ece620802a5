use fastwebsockets::{Frame, OpCode, Payload};

/// RFC 6455 default close code, used when the peer's close frame carries
/// no payload at all.
const CLOSE_CODE_NORMAL: u16 = 1000;

use crate::event::Event;

/// Thin translation layer between [`Event`] and the wire-level frames the
/// underlying sansio-style engine (`fastwebsockets`) understands. Encoding
/// never performs I/O; it only builds the `Frame` the caller then writes.
pub(crate) fn frame_for_event(event: Event) -> Frame<'static> {
    match event {
        Event::Text(text) => Frame::text(Payload::Owned(text.into_bytes())),
        Event::Bytes(bytes) => Frame::binary(Payload::Owned(bytes)),
        Event::Close { code, reason } => {
            Frame::close(code, reason.as_bytes())
        }
    }
}

pub(crate) fn ping_frame(payload: Vec<u8>) -> Frame<'static> {
    Frame::new(true, OpCode::Ping, None, Payload::Owned(payload))
}

/// Decodes a complete (already-reassembled) application frame into an
/// [`Event`]. Returns `Err` for a text frame whose payload is not valid
/// UTF-8, which the session treats as a protocol error.
pub(crate) fn event_for_frame(opcode: OpCode, payload: Vec<u8>) -> Result<Event, std::string::FromUtf8Error> {
    match opcode {
        OpCode::Text => Ok(Event::Text(String::from_utf8(payload)?)),
        OpCode::Binary | OpCode::Continuation => Ok(Event::Bytes(payload)),
        OpCode::Close => {
            let (code, reason) = decode_close_payload(&payload);
            Ok(Event::Close { code, reason })
        }
        OpCode::Ping | OpCode::Pong => {
            unreachable!("ping/pong are handled by the receive pump before reaching the adapter")
        }
    }
}

fn decode_close_payload(payload: &[u8]) -> (u16, String) {
    if payload.len() < 2 {
        return (CLOSE_CODE_NORMAL, String::new());
    }
    let code = u16::from_be_bytes([payload[0], payload[1]]);
    let reason = String::from_utf8_lossy(&payload[2..]).into_owned();
    (code, reason)
}
