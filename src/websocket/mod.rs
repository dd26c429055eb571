pub mod handler;
pub mod msg_awareness_handler;
pub mod msg_load_handler;
pub mod msg_ping_handler;
pub mod msg_update_handler;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

use crate::models::SendMessage;

/// Write half of a client socket, shared by the read loop and the relay loop.
pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Serialize and send a message to one client. Returns `false` if the socket is gone.
pub async fn send_message(sender: &WsSender, msg: &SendMessage) -> bool {
    let text = match serde_json::to_string(msg) {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to serialize outgoing message: {}", e);
            return false;
        }
    };
    sender.lock().await.send(Message::Text(text)).await.is_ok()
}
