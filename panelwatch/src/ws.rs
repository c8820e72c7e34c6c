//! WebSocket transport to wings, plus the seams the channel is generic over.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_tls_with_config,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Message},
    Connector as TlsConnector, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use crate::error::ChannelError;
use crate::types::Credential;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A text-frame duplex connection.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Next text frame; `None` once the peer closed. Must be cancel-safe.
    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>>;

    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Opens a transport for a freshly issued credential.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    async fn open(&self, credential: &Credential) -> Result<Self::Transport, ChannelError>;
}

#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    origin: Option<String>,
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl WsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// wings only accepts sockets whose Origin is the panel URL.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_tls(mut self, cfg: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(cfg);
        self
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn open(&self, credential: &Credential) -> Result<WsTransport, ChannelError> {
        let mut req = credential.socket.as_str().into_client_request()?;
        if let Some(origin) = &self.origin {
            let v = HeaderValue::from_str(origin)
                .map_err(|e| ChannelError::Transport(format!("bad origin {origin}: {e}")))?;
            req.headers_mut().insert("Origin", v);
        }
        let connector = self.tls.clone().map(TlsConnector::Rustls);
        let (ws, resp) = connect_async_tls_with_config(req, None, false, connector).await?;
        debug!(status = %resp.status(), socket = %credential.socket, "websocket open");
        Ok(WsTransport { ws })
    }
}

pub struct WsTransport {
    ws: WsStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(t)) => return Some(Ok(t)),
                Ok(Message::Binary(b)) => match String::from_utf8(b) {
                    Ok(t) => return Some(Ok(t)),
                    Err(e) => return Some(Err(ChannelError::Malformed(e.to_string()))),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "peer closed websocket");
                    return None;
                }
                // tungstenite answers pings itself
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.ws.close(None).await?;
        Ok(())
    }
}
