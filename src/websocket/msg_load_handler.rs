use tracing::{info, error};
use crate::models::{InitMessage, LoadMessage, SendMessage};
use crate::ws::docstore::SharedDoc;
use super::{send_message, WsSender};

/// Send the full room state to one client.
pub async fn send_init(doc: &SharedDoc, sender: &WsSender) -> bool {
    let snapshot = match doc.snapshot() {
        Ok(data) => data,
        Err(e) => {
            error!("{}", e);
            return false;
        }
    };

    let init_msg = SendMessage::Init(InitMessage {
        room: doc.room().to_string(),
        snapshot,
    });
    send_message(sender, &init_msg).await
}

/// Handle LoadMessage
pub async fn handle_load_message(load_msg: &LoadMessage, doc: &SharedDoc, sender: &WsSender) {
    info!("Load message received for room {}: user={}, peer={}", doc.room(), load_msg.user, load_msg.peer);

    if !send_init(doc, sender).await {
        error!("Failed to send Init message for room {}", doc.room());
    }
}
