use serde::{Deserialize, Serialize};

use crate::games::{GameKind, GameSettings, ScoreOutcome};
use crate::room::{DeckCode, PlayerId, RoomSnapshot};

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub user_id: PlayerId,
    pub name: String,
    pub game: GameKind,
    /// Defaults for `game` when omitted.
    pub settings: Option<GameSettings>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub user_id: PlayerId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub user_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub user_id: PlayerId,
    pub outcome: ScoreOutcome,
}

#[derive(Debug, Deserialize)]
pub struct FlipRequest {
    pub user_id: PlayerId,
    pub card: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChooseTeamRequest {
    pub user_id: PlayerId,
    pub team: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub user_id: PlayerId,
    pub settings: GameSettings,
}

#[derive(Debug, Deserialize)]
pub struct ImportDeckRequest {
    pub user_id: PlayerId,
    pub deck_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareDeckRequest {
    pub name: String,
    pub words: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub user_id: PlayerId,
}

#[derive(Serialize)]
pub struct RoomResponse {
    pub room: RoomSnapshot,
}

impl RoomResponse {
    pub fn new(room: RoomSnapshot) -> Self {
        Self { room }
    }
}

#[derive(Serialize)]
pub struct LeaveRoomResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomSnapshot>,
    pub deleted: bool,
}

#[derive(Serialize)]
pub struct ShareDeckResponse {
    pub code: DeckCode,
}
