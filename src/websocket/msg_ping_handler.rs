use tracing::{debug, error};
use chrono::Utc;
use crate::models::{PingMessage, PongMessage, SendMessage};
use super::{send_message, WsSender};

/// Handle PingMessage
pub async fn handle_ping_message(ping_msg: &PingMessage, room: &str, sender: &WsSender) {
    debug!("Ping message received for room {} from peer {}", room, ping_msg.peer);

    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if !send_message(sender, &pong).await {
        error!("Failed to send Pong message for room {}", room);
    }
}
