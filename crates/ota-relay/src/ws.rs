use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::AUTHORIZATION},
    },
};
use tracing::{debug, trace};

use crate::{
    auth::auth_header,
    config::{RelayConfig, Target},
    connection::{Connection, Connector},
    errors::{RelayError, WsError},
};

/// Websocket connector authenticating every handshake with the relay credentials.
#[derive(Clone)]
pub struct WsConnector {
    relay: RelayConfig,
    authorization: String,
}

impl WsConnector {
    pub fn new(relay: RelayConfig) -> Self {
        // wss handshakes need a process-wide rustls provider; an earlier install wins.
        let _ = rustls::crypto::ring::default_provider().install_default();
        let authorization = auth_header(&relay.login, &relay.password);
        Self {
            relay,
            authorization,
        }
    }
}

impl std::fmt::Debug for WsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnector")
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, RelayError> {
        let url = self.relay.build_url(target)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RelayError::InvalidEndpoint(format!("{url}: {e}")))?;
        let header = HeaderValue::from_str(&self.authorization)
            .map_err(|e| RelayError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, header);

        trace!(target: "ota.relay.ws", uid = %target.uid, "connecting");
        let (stream, response) = connect_async(request).await?;
        debug!(target: "ota.relay.ws", uid = %target.uid, status = %response.status(), "connected");

        Ok(Box::new(WsConnection {
            stream,
            uid: target.uid.clone(),
        }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    uid: String,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, message: &Value) -> Result<(), RelayError> {
        let payload = serde_json::to_string(message)?;
        trace!(target: "ota.relay.ws", uid = %self.uid, %payload, "send");
        self.stream
            .send(Message::text(payload))
            .await
            .map_err(|e| RelayError::Send(Box::new(e)))
    }

    async fn recv(&mut self) -> Result<Option<String>, RelayError> {
        while let Some(frame) = self.stream.next().await {
            match frame.map_err(|e| RelayError::Receive(Box::new(e)))? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                Message::Binary(bytes) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
                }
                Message::Close(frame) => {
                    debug!(target: "ota.relay.ws", uid = %self.uid, ?frame, "closed by relay");
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), RelayError> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(RelayError::Send(Box::new(e))),
        }
    }
}
