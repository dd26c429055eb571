use serde::{Deserialize, Serialize};
use serde_with::{serde_as, base64::Base64};

use crate::ws::connctx::ConnId;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoadMessage {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub peer: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    #[serde_as(as = "Base64")]
    pub delta: Vec<u8>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub peer: String,
}

/// Presence state of one peer (cursor, selection, user info). Relayed as is.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AwarenessMessage {
    #[serde_as(as = "Base64")]
    pub state: Vec<u8>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub peer: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PingMessage {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub peer: String,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InitMessage {
    pub room: String,
    #[serde_as(as = "Base64")]
    pub snapshot: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "load")]
    Load(LoadMessage),
    #[serde(rename = "update")]
    Update(UpdateMessage),
    #[serde(rename = "awareness")]
    Awareness(AwarenessMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "init")]
    Init(InitMessage),
    #[serde(rename = "update")]
    Update(UpdateMessage),
    #[serde(rename = "awareness")]
    Awareness(AwarenessMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

/// A serialized [`SendMessage`] on its way to the other members of a room.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub sender_id: ConnId,
    pub content: String,
}
