use std::future::Future;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connection closed{}", close_suffix(.code, .reason))]
    Closed { code: Option<u16>, reason: String },
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport io error: {0}")]
    Io(String),
    #[error("push channel is not open")]
    NotConnected,
    /// The response body ran past the payload cap. The connection itself
    /// is healthy.
    #[error("response body exceeds {max} bytes")]
    Oversized { max: usize },
}

fn close_suffix(code: &Option<u16>, reason: &str) -> String {
    match (code, reason.is_empty()) {
        (Some(code), true) => format!(" ({code})"),
        (Some(code), false) => format!(" ({code}: {reason})"),
        (None, false) => format!(" ({reason})"),
        (None, true) => String::new(),
    }
}

/// I/O seam between the sync loop and the network.
///
/// Push is a persistent duplex channel delivering one payload per message.
/// Pull is a single request/response returning the payload body.
pub trait Transport {
    /// Fixed for the lifetime of the process.
    fn push_supported(&self) -> bool;

    fn open_push(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// `None` once the channel has closed.
    fn next_message(
        &mut self,
    ) -> impl Future<Output = Option<Result<String, TransportError>>> + Send;

    fn fetch(&mut self) -> impl Future<Output = Result<String, TransportError>> + Send;
}
