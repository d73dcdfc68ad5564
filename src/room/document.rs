use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::games::{GameKind, GameSettings, GameState};

use super::error::RoomError;
use super::types::{Player, PlayerId, RoomCode, RoomStatus};

/// What `remove_player` did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRemoval {
    pub removed: Player,
    /// Set when the departing player was host and someone else took over.
    pub new_host: Option<PlayerId>,
    pub room_empty: bool,
}

/// The one shared aggregate: everything every client needs to render a
/// room, mutated only through the service operations and fanned out whole
/// to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDocument {
    pub code: RoomCode,
    pub host_id: PlayerId,
    pub players: Vec<Player>,
    pub status: RoomStatus,
    pub settings: GameSettings,
    pub state: Option<GameState>,
    /// Bumped on every committed write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomDocument {
    pub fn new(code: RoomCode, settings: GameSettings, host: Player, now: DateTime<Utc>) -> Self {
        let host_id = host.id;
        Self {
            code,
            host_id,
            players: vec![Player {
                is_host: true,
                ..host
            }],
            status: RoomStatus::Waiting,
            settings,
            state: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn game(&self) -> GameKind {
        self.settings.kind()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn is_member(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host_id == id
    }

    /// Append a player, enforcing id uniqueness.
    pub fn add_player(&mut self, player: Player) -> Result<(), RoomError> {
        if self.is_member(player.id) {
            return Err(RoomError::validation("player is already in the room"));
        }
        self.players.push(Player {
            is_host: false,
            ..player
        });
        Ok(())
    }

    /// Remove a player. When the host leaves and others remain, the next
    /// player in join order is promoted in the same mutation, so
    /// `host_id` always names a member.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<PlayerRemoval, RoomError> {
        let pos = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(RoomError::NotFound("player"))?;
        let removed = self.players.remove(pos);

        if self.players.is_empty() {
            return Ok(PlayerRemoval {
                removed,
                new_host: None,
                room_empty: true,
            });
        }

        let mut new_host = None;
        if removed.is_host {
            let promoted = &mut self.players[0];
            promoted.is_host = true;
            self.host_id = promoted.id;
            new_host = Some(promoted.id);
        }

        Ok(PlayerRemoval {
            removed,
            new_host,
            room_empty: false,
        })
    }

    /// Monotonic status transition; anything else is rejected.
    pub fn transition(&mut self, next: RoomStatus) -> Result<(), RoomError> {
        if !self.status.allows(next) {
            return Err(RoomError::validation(format!(
                "cannot move room from {:?} to {:?}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}
