use tracing::{debug, error};
use crate::models::{AwarenessMessage, BroadcastMessage, SendMessage};
use crate::ws::connctx::ConnId;
use crate::ws::docstore::SharedDoc;

/// Handle AwarenessMessage: presence is relayed to the other members as is,
/// it never touches the document.
pub fn handle_awareness_message(awareness_msg: AwarenessMessage, doc: &SharedDoc, connection_id: ConnId) {
    let content = match serde_json::to_string(&SendMessage::Awareness(awareness_msg)) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to serialize awareness for {}: {}", doc.room(), e);
            return;
        }
    };
    let receivers = doc.publish(BroadcastMessage { sender_id: connection_id, content });
    debug!("Awareness for room {} relayed to {} listener(s)", doc.room(), receivers);
}
