//! Test helpers for integration tests
//!
//! Provides a gateway server bound to an ephemeral port and a thin
//! WebSocket client around it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode};
use roomcast_common::{AppConfig, JwtService};
use roomcast_core::{UserId, UserRepository};
use roomcast_gateway::{create_app, create_gateway_state, GatewayState};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{is_presence, seed_users};

pub const TEST_SECRET: &str = "integration-test-secret";

/// How long a client waits for a frame before giving up
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: GatewayState,
    pub client: Client,
    jwt: JwtService,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server on memory storage and the local bus
    pub async fn start() -> Result<Self> {
        Self::start_with(&[]).await
    }

    /// Start a server with extra environment-style settings
    pub async fn start_with(overrides: &[(&str, &str)]) -> Result<Self> {
        let config = test_config(overrides)?;
        let state = create_gateway_state(config).await?;

        for user in seed_users() {
            state.service_context().user_repo().upsert(&user).await?;
        }

        let app = create_app(state.clone());
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            state,
            client,
            jwt: JwtService::new(TEST_SECRET, 3600),
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    pub fn token(&self, user_id: UserId) -> String {
        self.jwt
            .issue_token(user_id)
            .expect("token signing with a fixed secret")
    }

    /// Open a WebSocket with a bearer token in the header
    pub async fn connect(&self, path: &str, user_id: UserId) -> Result<WsClient> {
        let mut request = format!("ws://{}{}", self.addr, path).into_client_request()?;
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {}", self.token(user_id)).parse()?,
        );
        let (stream, _) = connect_async(request).await?;
        Ok(WsClient { stream })
    }

    /// Open a WebSocket passing the token as `?token=`
    pub async fn connect_with_query(&self, path: &str, user_id: UserId) -> Result<WsClient> {
        let url = format!("ws://{}{}?token={}", self.addr, path, self.token(user_id));
        let (stream, _) = connect_async(url).await?;
        Ok(WsClient { stream })
    }

    /// Attempt a connection that should be refused; returns the HTTP status
    pub async fn refused_status(&self, path: &str, token: Option<&str>) -> Result<StatusCode> {
        let mut url = format!("ws://{}{}", self.addr, path);
        if let Some(token) = token {
            url.push_str("?token=");
            url.push_str(token);
        }

        match connect_async(url).await {
            Ok(_) => bail!("connection to {path} was accepted"),
            Err(tungstenite::Error::Http(response)) => {
                Ok(StatusCode::from_u16(response.status().as_u16())?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Create a test configuration
pub fn test_config(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let mut vars: HashMap<String, String> = [
        ("STORAGE_BACKEND", "memory"),
        ("BUS_BACKEND", "local"),
        ("JWT_SECRET", TEST_SECRET),
        ("GATEWAY_HOST", "127.0.0.1"),
        ("GATEWAY_PORT", "0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    AppConfig::from_lookup(|key| vars.get(key).cloned())
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Client side of a gateway session
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send_raw(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    pub async fn send_chat(&mut self, content: &str) -> Result<()> {
        self.send_raw(crate::fixtures::chat_frame(content)).await
    }

    /// Next JSON text frame, skipping control frames
    pub async fn next_json(&mut self) -> Result<Value> {
        loop {
            let frame = tokio::time::timeout(FRAME_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for a frame")?;

            match frame {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(frame))) => bail!("connection closed: {frame:?}"),
                Some(Ok(other)) => bail!("unexpected frame: {other:?}"),
                Some(Err(e)) => return Err(e.into()),
                None => bail!("connection ended"),
            }
        }
    }

    /// Next room message, skipping presence notices
    pub async fn next_message(&mut self) -> Result<Value> {
        loop {
            let frame = self.next_json().await?;
            if !is_presence(&frame) {
                return Ok(frame);
            }
        }
    }

    /// Next presence notice, skipping room messages
    pub async fn next_presence(&mut self) -> Result<Value> {
        loop {
            let frame = self.next_json().await?;
            if is_presence(&frame) {
                return Ok(frame);
            }
        }
    }

    /// Next presence notice about `user_id`
    pub async fn next_presence_for(&mut self, user_id: UserId) -> Result<Value> {
        loop {
            let frame = self.next_presence().await?;
            if frame["user_id"] == user_id.into_inner() {
                return Ok(frame);
            }
        }
    }

    /// Assert no room message arrives within `wait`
    pub async fn expect_no_message(&mut self, wait: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, self.stream.next()).await {
                Err(_) => return Ok(()),
                Ok(Some(Ok(Message::Text(text)))) => {
                    let frame: Value = serde_json::from_str(&text)?;
                    if !is_presence(&frame) {
                        bail!("unexpected message: {frame}");
                    }
                }
                Ok(Some(Ok(_))) => {}
                Ok(other) => bail!("connection ended: {other:?}"),
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
