//! Transports carrying relay protocol frames.
//!
//! A [`Connector`] opens one [`Transport`] per relay session. The production
//! connector speaks WebSocket via tokio-tungstenite; tests use the in-memory
//! relay in [`crate::memory`].

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info};
use url::Url;

/// A bidirectional stream of text frames to one relay.
#[async_trait]
pub trait Transport: Send {
    /// Send one text frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Receive the next text frame.
    ///
    /// Returns `Ok(None)` once the relay has closed the stream.
    async fn recv(&mut self) -> Result<Option<String>>;

    /// Close the stream. Dropping a transport also releases it.
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports to relay URLs.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>>;
}

/// Validate a relay URL, which must use the ws:// or wss:// scheme.
pub fn parse_relay_url(url: &str) -> Result<Url> {
    let url = Url::parse(url)?;

    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(ClientError::InvalidUrl(format!(
            "URL must use ws:// or wss:// scheme, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Connector for real relays over WebSocket.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        let url = parse_relay_url(url)?;

        debug!("Connecting to relay: {}", url);
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;
        info!("Connected to relay: {}", url);

        Ok(Box::new(WebSocketTransport { url, stream }))
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One WebSocket connection to a relay.
pub struct WebSocketTransport {
    url: Url,
    stream: WsStream,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        debug!("Sending to {}: {}", self.url, text);
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| ClientError::WebSocket(e.to_string()))?;
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Relay {} closed connection", self.url);
                    return Ok(None);
                }
                Some(Ok(_)) => continue, // Ignore other message types
                Some(Err(e)) => return Err(ClientError::WebSocket(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        debug!("Disconnecting from relay: {}", self.url);
        self.stream
            .close(None)
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relay_url() {
        assert!(parse_relay_url("wss://relay.damus.io").is_ok());
        assert!(parse_relay_url("ws://127.0.0.1:7000").is_ok());
    }

    #[test]
    fn test_parse_relay_url_rejects_other_schemes() {
        assert!(matches!(
            parse_relay_url("https://relay.damus.io"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_relay_url("not a url"),
            Err(ClientError::UrlParse(_))
        ));
    }

    #[tokio::test]
    async fn test_websocket_connector_rejects_invalid_url() {
        let result = WebSocketConnector.connect("http://example.com").await;
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
