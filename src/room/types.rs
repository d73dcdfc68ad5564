use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-facing room code, short uppercase alphanumeric.
pub type RoomCode = String;
/// Opaque code under which a shared word/question deck is published.
pub type DeckCode = String;
/// Stable per-device user id; doubles as the player id inside a room.
pub type PlayerId = Uuid;
/// Index into the configured team list.
pub type TeamIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Allowed edges are monotonic per session: waiting -> playing ->
    /// finished -> waiting (explicit reset). Everything else is rejected.
    pub fn allows(self, next: RoomStatus) -> bool {
        matches!(
            (self, next),
            (RoomStatus::Waiting, RoomStatus::Playing)
                | (RoomStatus::Playing, RoomStatus::Finished)
                | (RoomStatus::Finished, RoomStatus::Waiting)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Option<TeamIndex>,
    pub is_host: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            team: None,
            is_host: false,
        }
    }

    pub fn host(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            is_host: true,
            ..Self::new(id, name)
        }
    }
}
