// SPDX-License-Identifier: Apache-2.0
//! Minimal async client for the whiteboard sync protocol, used by
//! integration tests and the `board-client` smoke-test binary.

use anyhow::{anyhow, Result};
use board_proto::{ClientMessage, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// A connected whiteboard client.
pub struct BoardClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl BoardClient {
    /// Connect to `ws://<addr>/ws`.
    pub async fn connect(addr: &str) -> Result<Self> {
        let url = format!("ws://{addr}/ws");
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self { stream })
    }

    /// Send one client message as a JSON text frame.
    pub async fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let text = serde_json::to_string(msg)?;
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Wait for the next server message, skipping WebSocket control frames.
    pub async fn recv(&mut self) -> Result<ServerMessage> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(err.into()),
                None => return Err(anyhow!("connection closed")),
            }
        }
    }
}
