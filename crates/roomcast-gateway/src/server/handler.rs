//! WebSocket handlers
//!
//! Identity and room access are settled before the upgrade; a refused
//! connection gets an HTTP error and is never upgraded. An accepted one is
//! driven by a reader task and a writer task until either ends.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::Stream;
use futures_util::StreamExt;
use roomcast_common::ErrorResponse;
use roomcast_core::{MessageId, RoomEvent, RoomName};
use serde::Deserialize;
use tokio::sync::{mpsc, Notify};
use tokio::time::{interval_at, Instant};

use crate::connection::{ConnectScope, Connected, ConnectionManager, Session, Transport};
use crate::handlers::{bearer_token, HandlerError};
use crate::protocol::{rejection_frame, CloseCode};
use crate::server::GatewayState;

/// Buffer for writer commands from the reader
const CONTROL_BUFFER: usize = 16;

/// How long the writer gets to flush a close frame once the reader is done
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Query parameters accepted on connect
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// `GET /chat/{room}`
pub async fn room_handler(
    State(state): State<GatewayState>,
    Path(room): Path<String>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let name = match RoomName::parse(&room) {
        Ok(name) => name,
        Err(e) => return refuse(&HandlerError::InvalidRoom(e.to_string())),
    };
    upgrade(state, ConnectScope::Room(name), &headers, params, ws).await
}

/// `GET /status`
pub async fn status_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(state, ConnectScope::Presence, &headers, params, ws).await
}

async fn upgrade(
    state: GatewayState,
    scope: ConnectScope,
    headers: &HeaderMap,
    params: ConnectParams,
    ws: WebSocketUpgrade,
) -> Response {
    let token = bearer_token(headers).map(str::to_owned).or(params.token);

    let identity = match state.authenticator().authenticate(token.as_deref()).await {
        Ok(identity) => identity,
        Err(e) => return refuse(&e),
    };

    let connected = match state.connection_manager().connect(scope, identity).await {
        Ok(connected) => connected,
        Err(e) => return refuse(&e),
    };

    let manager = state.connection_manager_arc();
    let session = connected.session.clone();
    let max_frame = manager.chat_config().max_frame_bytes;

    ws.max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_failed_upgrade(move |error| {
            tracing::warn!(session_id = session.id(), error = %error, "WebSocket upgrade failed");
            tokio::spawn(async move {
                manager.disconnect(&session).await;
            });
        })
        .on_upgrade(move |socket| handle_socket(state, connected, socket))
}

/// Refuse a connection with the status its error calls for
fn refuse(error: &HandlerError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), kind = error.error_code(), error = %error, "Connection refused");
    } else {
        tracing::info!(status = status.as_u16(), kind = error.error_code(), "Connection refused");
    }

    let body = ErrorResponse {
        code: error.error_code().to_string(),
        message: error.to_string(),
        details: None,
    };
    (status, Json(body)).into_response()
}

async fn handle_socket(state: GatewayState, connected: Connected, socket: WebSocket) {
    let Connected {
        session,
        events,
        eviction,
        history,
    } = connected;
    let manager = state.connection_manager_arc();
    let chat = manager.chat_config().clone();

    let (sink, stream) = socket.split();
    let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);

    let outbound = Outbound {
        events,
        control: control_rx,
        eviction,
        history,
        ping: (chat.ping_interval_secs > 0).then(|| Duration::from_secs(chat.ping_interval_secs)),
    };
    let inbound = Inbound {
        control: control_tx,
        idle: (chat.idle_timeout_secs > 0).then(|| Duration::from_secs(chat.idle_timeout_secs)),
        notify_rejections: chat.notify_rejections,
    };

    let mut writer = tokio::spawn(write_loop(manager.clone(), session.clone(), sink, outbound));
    let mut reader = tokio::spawn(read_loop(manager.clone(), session.clone(), stream, inbound));

    tokio::select! {
        result = &mut reader => {
            tracing::debug!(session_id = session.id(), close = ?result.ok().flatten(), "Reader ended");
            if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
                writer.abort();
            }
        }
        result = &mut writer => {
            tracing::debug!(session_id = session.id(), close = ?result.ok().flatten(), "Writer ended");
            reader.abort();
        }
    }

    manager.disconnect(&session).await;
}

/// Commands from the reader to the writer
#[derive(Debug)]
pub(crate) enum Control {
    Text(String),
    Close(CloseCode),
}

pub(crate) struct Outbound {
    pub events: mpsc::Receiver<RoomEvent>,
    pub control: mpsc::Receiver<Control>,
    pub eviction: Arc<Notify>,
    pub history: Vec<RoomEvent>,
    pub ping: Option<Duration>,
}

pub(crate) struct Inbound {
    pub control: mpsc::Sender<Control>,
    pub idle: Option<Duration>,
    pub notify_rejections: bool,
}

fn room_message_id(event: &RoomEvent) -> Option<MessageId> {
    match event {
        RoomEvent::RoomMessage(msg) => Some(msg.message_id),
        RoomEvent::PresenceChange(_) => None,
    }
}

/// Drive the write half. Returns the close code sent, if the gateway closed it.
pub(crate) async fn write_loop<T: Transport>(
    manager: Arc<ConnectionManager>,
    session: Arc<Session>,
    mut transport: T,
    mut out: Outbound,
) -> Option<CloseCode> {
    // Live events already covered by the replay are skipped
    let replayed_until = out.history.iter().filter_map(room_message_id).max();
    for event in &out.history {
        if manager.on_room_event(&session, event, &mut transport).await.is_err() {
            return None;
        }
    }

    let period = out.ping.unwrap_or(Duration::from_secs(3600));
    let mut keepalive = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            biased;

            () = out.eviction.notified() => {
                tracing::warn!(session_id = session.id(), "Evicted as slow consumer");
                let _ = transport.close(CloseCode::SlowConsumer).await;
                return Some(CloseCode::SlowConsumer);
            }

            control = out.control.recv() => match control {
                Some(Control::Text(text)) => {
                    if transport.send_text(text).await.is_err() {
                        return None;
                    }
                }
                Some(Control::Close(code)) => {
                    let _ = transport.close(code).await;
                    return Some(code);
                }
                None => return None,
            },

            event = out.events.recv() => match event {
                Some(event) => {
                    let replayed = room_message_id(&event)
                        .zip(replayed_until)
                        .is_some_and(|(id, last)| id <= last);
                    if !replayed && manager.on_room_event(&session, &event, &mut transport).await.is_err() {
                        return None;
                    }
                }
                None => return None,
            },

            _ = keepalive.tick(), if out.ping.is_some() => {
                if transport.ping().await.is_err() {
                    return None;
                }
            }
        }
    }
}

/// Drive the read half. Returns the close code requested, if any.
pub(crate) async fn read_loop<S>(
    manager: Arc<ConnectionManager>,
    session: Arc<Session>,
    mut stream: S,
    inbound: Inbound,
) -> Option<CloseCode>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
{
    loop {
        let next = match inbound.idle {
            Some(idle) => {
                if let Ok(next) = tokio::time::timeout(idle, stream.next()).await {
                    next
                } else {
                    tracing::info!(session_id = session.id(), "Idle timeout");
                    let _ = inbound.control.send(Control::Close(CloseCode::IdleTimeout)).await;
                    return Some(CloseCode::IdleTimeout);
                }
            }
            None => stream.next().await,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                if let Err(e) = manager.receive(&session, &text).await {
                    e.log_dropped(session.id());
                    if let Some(rejection) = e.rejection().filter(|_| inbound.notify_rejections) {
                        let _ = inbound.control.send(Control::Text(rejection_frame(rejection))).await;
                    }
                }
            }
            Some(Ok(Message::Binary(_))) => {
                HandlerError::MalformedPayload("binary frame").log_dropped(session.id());
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                tracing::trace!(session_id = session.id(), "Control frame received");
            }
            Some(Ok(Message::Close(_))) | None => {
                tracing::debug!(session_id = session.id(), "Client closed connection");
                return None;
            }
            Some(Err(e)) => {
                tracing::warn!(session_id = session.id(), error = %e, "WebSocket error");
                return None;
            }
        }
    }
}
