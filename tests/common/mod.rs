use base64::Engine;
use fastwebsockets::{Role, WebSocket};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Reads the client's Upgrade request off `io` and returns the raw value
/// of its `Sec-WebSocket-Key` header, plus anything read past the header
/// block (there never is any: the client sends no body).
async fn read_request_key(io: &mut DuplexStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = io.read(&mut chunk).await.expect("read request");
        assert!(n > 0, "peer closed before sending a full request");
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&buf);
    text.lines()
        .find_map(|line| line.to_ascii_lowercase().starts_with("sec-websocket-key:").then(|| {
            line.splitn(2, ':').nth(1).unwrap().trim().to_string()
        }))
        .expect("request carried no Sec-WebSocket-Key header")
}

fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Plays the server side of the handshake against the other end of an
/// in-memory duplex pipe, then hands back a raw [`WebSocket`] ready for
/// the test to drive frame-by-frame. Stands in for a real HTTP server in
/// these tests.
pub async fn accept_websocket(mut io: DuplexStream) -> WebSocket<DuplexStream> {
    let key = read_request_key(&mut io).await;
    let accept = accept_key(&key);
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    );
    io.write_all(response.as_bytes()).await.expect("write 101 response");
    WebSocket::after_handshake(io, Role::Server)
}

/// Rejects the handshake with a plain `status` response and no Upgrade,
/// carrying `body` as the response content.
pub async fn reject_websocket(mut io: DuplexStream, status: u16, reason: &str, body: &str) {
    let _key = read_request_key(&mut io).await;
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    io.write_all(response.as_bytes()).await.expect("write rejection response");
}
