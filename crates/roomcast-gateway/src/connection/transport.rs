//! Outbound transport seam

use std::borrow::Cow;

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::SplitSink;
use futures_util::SinkExt;

use crate::protocol::CloseCode;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
}

/// The write half of a client connection
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn ping(&mut self) -> Result<(), TransportError>;

    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError>;
}

#[async_trait]
impl Transport for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        self.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    async fn close(&mut self, code: CloseCode) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: code.as_u16(),
            reason: Cow::Borrowed(code.reason()),
        };
        self.send(Message::Close(Some(frame))).await?;
        Ok(())
    }
}
