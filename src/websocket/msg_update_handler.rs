use tracing::{debug, error};
use crate::models::{BroadcastMessage, SendMessage, UpdateMessage};
use crate::ws::connctx::ConnId;
use crate::ws::docstore::SharedDoc;

/// Handle UpdateMessage: import the delta into the room document, then relay it.
/// A delta the document rejects is not relayed.
pub fn handle_update_message(update_msg: UpdateMessage, doc: &SharedDoc, connection_id: ConnId) -> bool {
    debug!("Update message received for room {}: user={}, peer={}, {} bytes", doc.room(), update_msg.user, update_msg.peer, update_msg.delta.len());

    if let Err(e) = doc.apply_update(&update_msg.delta) {
        error!("Rejected update from connection {}: {}", connection_id, e);
        return false;
    }

    let content = match serde_json::to_string(&SendMessage::Update(update_msg)) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to serialize update for {}: {}", doc.room(), e);
            return false;
        }
    };
    let receivers = doc.publish(BroadcastMessage { sender_id: connection_id, content });
    debug!("Update for room {} relayed to {} listener(s)", doc.room(), receivers);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use loro::LoroDoc;

    fn text_update(text: &str) -> Vec<u8> {
        let source = LoroDoc::new();
        source.get_text("text").insert(0, text).unwrap();
        source.commit();
        source.export(loro::ExportMode::all_updates()).unwrap()
    }

    #[test]
    fn valid_update_is_applied_and_relayed() {
        let doc = SharedDoc::new("roomA");
        let mut rx = doc.subscribe().unwrap();
        let update = UpdateMessage { delta: text_update("hi"), user: "u".into(), peer: "1".into() };

        assert!(handle_update_message(update, &doc, 7));
        assert_eq!(doc.doc().get_text("text").to_string(), "hi");

        let relayed = rx.try_recv().unwrap();
        assert_eq!(relayed.sender_id, 7);
        let json: serde_json::Value = serde_json::from_str(&relayed.content).unwrap();
        assert_eq!(json["type"], "update");
    }

    #[test]
    fn rejected_update_is_not_relayed() {
        let doc = SharedDoc::new("roomA");
        let mut rx = doc.subscribe().unwrap();
        let update = UpdateMessage { delta: vec![0, 1, 2], user: "u".into(), peer: "1".into() };

        assert!(!handle_update_message(update, &doc, 7));
        assert!(rx.try_recv().is_err());
    }
}
