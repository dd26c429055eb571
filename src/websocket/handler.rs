use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, ConnectInfo, FromRequestParts, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tracing::{debug, info, warn};

use crate::models::ReceivedMessage;
use crate::utils::scope_guard::ScopeGuard;
use crate::ws::connctx::{resolve_room_name, ConnCtx};
use crate::ws::wscolab::{ColabHub, Joined};
use crate::AppState;
use super::msg_awareness_handler::handle_awareness_message;
use super::msg_load_handler::{handle_load_message, send_init};
use super::msg_ping_handler::handle_ping_message;
use super::msg_update_handler::handle_update_message;
use super::WsSender;

/// WebSocket handler. The trailing segment of the request path names the room.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    uri: Uri,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<AppState>,
) -> Response {
    let room = resolve_room_name(uri.path(), &state.default_room);
    let remote = connect_info.map(|ConnectInfo(addr)| addr);
    info!("New WebSocket connection attempt for room \"{}\"", room);
    ws.on_upgrade(move |socket| handle_socket(socket, ConnCtx::new(room, remote), state.hub))
}

/// Upgrade requests always address a room, even on paths the API serves.
/// Everything else continues to the router.
pub async fn upgrade_any_path(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => {
            let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>().cloned();
            websocket_handler(ws, parts.uri, connect_info, State(state)).await
        }
        Err(rejection) => {
            debug!("Not a usable WebSocket upgrade on {}: {}", parts.uri.path(), rejection);
            next.run(Request::from_parts(parts, body)).await
        }
    }
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, conn: ConnCtx, hub: ColabHub) {
    match conn.remote {
        Some(addr) => info!("Connection {} established from {}", conn.id, addr),
        None => info!("Connection {} established", conn.id),
    }

    let Joined { member_count, doc } = hub.join(&conn);
    debug!("Connection {} attached to room \"{}\" as member {}", conn.id, conn.room, member_count);

    // However this function ends, the room has to see the leave.
    let _leave = ScopeGuard::new({
        let hub = hub.clone();
        let conn = conn.clone();
        move || {
            hub.leave(&conn);
        }
    });

    let Some(mut relay) = doc.subscribe() else {
        warn!("Room \"{}\" was released before connection {} attached", conn.room, conn.id);
        return;
    };

    let (sink, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sink));

    if !send_init(&doc, &sender).await {
        warn!("Could not send initial state to connection {}", conn.id);
        return;
    }

    // Read loop: client messages are applied to the room and relayed
    let mut recv_task = {
        let sender = sender.clone();
        let doc = doc.clone();
        let conn = conn.clone();
        tokio::spawn(async move {
            while let Some(msg) = receiver.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(frame)) => {
                        let code = frame.map(|f| f.code);
                        info!("User {} disconnected from room \"{}\" (code: {:?})", conn.id, conn.room, code);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("WebSocket error for connection {}: {}", conn.id, e);
                        break;
                    }
                };

                let received: ReceivedMessage = match serde_json::from_str(&text) {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("Failed to parse message from connection {} in room {}: {}", conn.id, conn.room, e);
                        continue;
                    }
                };

                match received {
                    ReceivedMessage::Load(load_msg) => {
                        handle_load_message(&load_msg, &doc, &sender).await;
                    }
                    ReceivedMessage::Update(update_msg) => {
                        if handle_update_message(update_msg, &doc, conn.id) {
                            hub.touch(&conn.room);
                        }
                    }
                    ReceivedMessage::Awareness(awareness_msg) => {
                        handle_awareness_message(awareness_msg, &doc, conn.id);
                    }
                    ReceivedMessage::Ping(ping_msg) => {
                        handle_ping_message(&ping_msg, &conn.room, &sender).await;
                    }
                }
            }
        })
    };

    // Relay loop: messages from the other members go out to this client
    let mut send_task = {
        let sender = sender.clone();
        let doc = doc.clone();
        let conn_id = conn.id;
        tokio::spawn(async move {
            loop {
                match relay.recv().await {
                    Ok(broadcast_msg) => {
                        // Skip messages from this connection to prevent echo
                        if broadcast_msg.sender_id == conn_id {
                            continue;
                        }
                        if sender.lock().await.send(Message::Text(broadcast_msg.content)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Connection {} missed {} message(s), resending state", conn_id, skipped);
                        if !send_init(&doc, &sender).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut recv_task) => send_task.abort(),
        _ = (&mut send_task) => recv_task.abort(),
    };
    info!("Connection {} to room \"{}\" terminated", conn.id, conn.room);
}
