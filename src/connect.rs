use std::sync::Arc;

use bytes::Bytes;
use fastwebsockets::FragmentCollectorRead;
use http::{StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper::header::{
    CONNECTION, HOST, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_PROTOCOL, SEC_WEBSOCKET_VERSION, UPGRADE,
};
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::config::ConnectConfig;
use crate::error::{Result, WSError};
use crate::session::Session;
use crate::stream::SharedWriteHalf;

/// Performs the Upgrade handshake against `url` and returns a live,
/// running [`Session`]. The HTTP client here is a bare `hyper` connection
/// over a freshly dialed TCP stream; it's an implementation detail, not a
/// parameter, since this crate owns dialing rather than borrowing an
/// ambient async HTTP client that doesn't exist in this ecosystem.
/// `connect_with_io` below accepts a caller-supplied stream for anyone who
/// needs TLS or a non-TCP transport.
pub async fn connect(
    url: &str,
    config: ConnectConfig,
) -> Result<Session<TokioIo<hyper::upgrade::Upgraded>>> {
    let parsed = url::Url::parse(url).map_err(WSError::network)?;
    if parsed.scheme() != "ws" {
        return Err(WSError::network(anyhow::anyhow!(
            "unsupported scheme {:?}: only ws:// is supported by the bundled dialer, use connect_with_io for wss://",
            parsed.scheme()
        )));
    }
    let host = parsed.host_str().ok_or_else(|| WSError::network(anyhow::anyhow!("url has no host")))?;
    let port = parsed.port_or_known_default().unwrap_or(80);

    let mut path_and_query = parsed.path().to_owned();
    if let Some(query) = parsed.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }
    let uri: Uri = format!("http://{host}:{port}{path_and_query}")
        .parse()
        .map_err(WSError::network)?;

    let tcp = TcpStream::connect((host, port)).await.map_err(WSError::network)?;
    tcp.set_nodelay(true).map_err(WSError::network)?;

    connect_with_io(uri, TokioIo::new(tcp), config).await
}

/// Same handshake as [`connect`], over a caller-supplied, already-dialed
/// stream. Use this to layer TLS or any other transport yourself; this
/// crate does not terminate TLS itself.
///
/// The returned session is always generic over `TokioIo<Upgraded>`: once
/// `hyper` takes ownership of `io` for the handshake, the only handle back
/// to the underlying bytes is the `Upgraded` object it hands out, whatever
/// `S` was.
pub async fn connect_with_io<S>(
    uri: Uri,
    io: S,
    config: ConnectConfig,
) -> Result<Session<TokioIo<hyper::upgrade::Upgraded>>>
where
    S: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let authority = uri.authority().map(|a| a.as_str().to_owned()).unwrap_or_default();
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    let mut builder = Request::builder()
        .method("GET")
        .uri(path_and_query)
        .header(HOST, authority.as_str())
        .header(CONNECTION, "upgrade")
        .header(UPGRADE, "websocket")
        .header(SEC_WEBSOCKET_KEY, fastwebsockets::handshake::generate_key())
        .header(SEC_WEBSOCKET_VERSION, "13");

    if !config.subprotocols.is_empty() {
        builder = builder.header(SEC_WEBSOCKET_PROTOCOL, config.subprotocols.join(", "));
    }
    for (name, value) in &config.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let request = builder
        .body(Empty::<Bytes>::new())
        .map_err(WSError::network)?;

    debug!(?request, "sending websocket upgrade request");

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(WSError::network)?;

    tokio::spawn(async move {
        if let Err(err) = conn.with_upgrades().await {
            tracing::trace!(error = %err, "websocket handshake connection task ended");
        }
    });

    let response = sender.send_request(request).await.map_err(WSError::network)?;

    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        let (parts, body) = response.into_parts();
        let body = body.collect().await.map(|collected| collected.to_bytes()).unwrap_or_default();
        return Err(WSError::Upgrade { response: parts, body });
    }

    let subprotocol = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    let upgraded = hyper::upgrade::on(response).await.map_err(WSError::network)?;
    let io = TokioIo::new(upgraded);

    let mut ws = fastwebsockets::WebSocket::after_handshake(io, fastwebsockets::Role::Client);
    ws.set_max_message_size(config.session.max_message_size_bytes);
    ws.set_auto_apply_mask(true);

    let mut shutdown_arc = None;
    let (ws_rx, ws_tx) = ws.split(|stream| {
        let (read_half, write_half) = tokio::io::split(stream);
        let write_half = Arc::new(TokioMutex::new(write_half));
        shutdown_arc = Some(write_half.clone());
        (read_half, SharedWriteHalf::new(write_half))
    });
    let ws_rx = FragmentCollectorRead::new(ws_rx);
    let shutdown_handle = shutdown_arc.expect("split closure always runs exactly once");

    Ok(Session::spawn(ws_rx, ws_tx, shutdown_handle, config.session, subprotocol))
}
