use futures_util::StreamExt;
use lineboard_core::config::{ConfigError, SyncConfig};
use lineboard_core::transport::{Transport, TransportError};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

type PushSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// WebSocket push channel plus HTTP `GET` fallback.
pub struct NetTransport {
    push_url: Option<Url>,
    update_url: Url,
    http: reqwest::Client,
    socket: Option<PushSocket>,
    max_body_bytes: usize,
}

impl NetTransport {
    pub fn new(config: &SyncConfig) -> Result<Self, SetupError> {
        let push_url = if config.push_enabled {
            config.push_url()
        } else {
            None
        };
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            push_url,
            update_url: config.update_url()?,
            http,
            socket: None,
            max_body_bytes: config.max_payload_bytes,
        })
    }

    pub fn push_url(&self) -> Option<&Url> {
        self.push_url.as_ref()
    }

    pub fn update_url(&self) -> &Url {
        &self.update_url
    }
}

impl Transport for NetTransport {
    fn push_supported(&self) -> bool {
        self.push_url.is_some()
    }

    async fn open_push(&mut self) -> Result<(), TransportError> {
        self.socket = None;
        let url = self.push_url.as_ref().ok_or(TransportError::NotConnected)?;
        let (socket, response) = connect_async(url.as_str())
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        debug!(event = "push_handshake", url = %url, status = response.status().as_u16());
        self.socket = Some(socket);
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<String, TransportError>> {
        let Some(socket) = self.socket.as_mut() else {
            return Some(Err(TransportError::NotConnected));
        };
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Some(Ok(Message::Close(frame))) => {
                    self.socket = None;
                    let (code, reason) = frame
                        .map(|frame| (Some(u16::from(frame.code)), frame.reason.into_owned()))
                        .unwrap_or((None, String::new()));
                    return Some(Err(TransportError::Closed { code, reason }));
                }
                // Pings are answered by tungstenite on read.
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    self.socket = None;
                    return Some(Err(TransportError::Io(err.to_string())));
                }
                None => {
                    self.socket = None;
                    return None;
                }
            }
        }
    }

    async fn fetch(&mut self) -> Result<String, TransportError> {
        let mut response = self
            .http
            .get(self.update_url.clone())
            .send()
            .await
            .map_err(map_http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let max = self.max_body_bytes;
        if response
            .content_length()
            .is_some_and(|len| len > max as u64)
        {
            return Err(TransportError::Oversized { max });
        }
        // Chunked bodies carry no length up front.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_http_error)? {
            if body.len() + chunk.len() > max {
                return Err(TransportError::Oversized { max });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn map_http_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Io(err.to_string())
    }
}
