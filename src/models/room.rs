use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// State of one room as seen by the lifecycle manager
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryResponse {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub member_count: u32,
    /// An empty room waiting for its cleanup timer
    pub cleanup_pending: bool,
    pub has_document: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummaryResponse>,
}
