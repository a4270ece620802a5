//! Connects to a WebSocket echo server, sends a text message, and prints
//! whatever comes back. Run with `cargo run --example echo -- ws://host/path`
//! once this file is wired into `Cargo.toml`'s `[[example]]` table.

use std::time::Duration;

use wsclient::{connect, ConnectConfig, Event};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "ws://127.0.0.1:8080/echo".to_string());
    let session = connect(&url, ConnectConfig::new()).await?;

    session.send_text("hello from wsclient").await?;

    match session.receive(Some(Duration::from_secs(5))).await {
        Ok(Event::Text(text)) => println!("received: {text}"),
        Ok(Event::Bytes(bytes)) => println!("received {} bytes", bytes.len()),
        Ok(Event::Close { code, reason }) => println!("peer closed: {code} {reason}"),
        Err(err) => eprintln!("receive failed: {err}"),
    }

    Ok(())
}
