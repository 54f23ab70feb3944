//! Live tracking over WebSocket.
//!
//! Clients join one or more booking rooms; drivers push locations and status
//! changes on the same socket. Every frame is JSON tagged by `type`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::StreamMap;
use tracing::{debug, info, warn};
use uuid::Uuid;
use uyir_shared::{GeoPoint, TrackingEvent};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinBooking {
        #[serde(alias = "bookingId")]
        booking_id: Uuid,
    },
    DriverLocation {
        #[serde(alias = "bookingId")]
        booking_id: Uuid,
        location: GeoPoint,
    },
    BookingStatus {
        #[serde(alias = "bookingId")]
        booking_id: Uuid,
        status: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined { booking_id: Uuid },
    Error { message: String },
}

type EventStream = Pin<Box<dyn Stream<Item = TrackingEvent> + Send>>;

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    state.metrics.ws_connections.inc();
    info!(%conn_id, "Tracking connection opened");

    let (mut sender, mut receiver) = socket.split();
    let mut rooms: StreamMap<Uuid, EventStream> = StreamMap::new();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!(%conn_id, error = %e, "Tracking connection errored");
                        break;
                    }
                };

                let replies = handle_client_text(&state, &mut rooms, text.as_str()).await;
                if send_all(&mut sender, replies).await.is_err() {
                    break;
                }
            }
            Some((_, event)) = rooms.next(), if !rooms.is_empty() => {
                let Ok(frame) = serde_json::to_string(&event) else {
                    continue;
                };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let joined: Vec<Uuid> = rooms.keys().copied().collect();
    drop(rooms);
    for booking_id in &joined {
        state.tracking.leave(*booking_id);
    }

    state.metrics.ws_connections.dec();
    info!(%conn_id, rooms = joined.len(), "Tracking connection closed");
}

/// Apply one client frame. Returns frames for this client only; room
/// broadcasts travel through the tracking hub.
async fn handle_client_text(
    state: &AppState,
    rooms: &mut StreamMap<Uuid, EventStream>,
    text: &str,
) -> Vec<ServerMessage> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return vec![ServerMessage::Error {
                message: format!("unreadable message: {}", e),
            }]
        }
    };

    let result = match message {
        ClientMessage::JoinBooking { booking_id } => {
            if rooms.contains_key(&booking_id) {
                Ok(Some(ServerMessage::Joined { booking_id }))
            } else {
                match state.tracking.subscribe_stream(booking_id).await {
                    Ok(stream) => {
                        rooms.insert(booking_id, Box::pin(stream));
                        Ok(Some(ServerMessage::Joined { booking_id }))
                    }
                    Err(e) => Err(AppError::from(e)),
                }
            }
        }
        ClientMessage::DriverLocation { booking_id, location } => state
            .tracking
            .publish_location(booking_id, location)
            .await
            .map(|_| None)
            .map_err(AppError::from),
        ClientMessage::BookingStatus { booking_id, status } => state
            .tracking
            .publish_status(booking_id, &status)
            .await
            .map(|_| None)
            .map_err(AppError::from),
    };

    match result {
        Ok(reply) => reply.into_iter().collect(),
        Err(err) => {
            warn!(status = %err.status(), "Tracking message refused");
            vec![ServerMessage::Error {
                message: err.public_message(),
            }]
        }
    }
}

async fn send_all<S>(sender: &mut S, messages: Vec<ServerMessage>) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    for message in messages {
        let frame = serde_json::to_string(&message)
            .unwrap_or_else(|e| format!(r#"{{"type":"error","message":"{}"}}"#, e));
        sender.send(Message::Text(frame.into())).await?;
    }
    Ok(())
}
