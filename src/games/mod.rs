pub mod charades;
pub mod deck;
pub mod emoji;
pub mod memory;
pub mod sharing;
pub mod sketch;
pub mod spy;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::room::error::RoomError;
use crate::room::types::{Player, PlayerId};

pub use charades::{CharadesSettings, CharadesState};
pub use deck::{Deck, DeckSource};
pub use emoji::{EmojiPuzzle, EmojiSettings, EmojiState};
pub use memory::{MemorySettings, MemoryState};
pub use sharing::{SharingSettings, SharingState};
pub use sketch::{SketchSettings, SketchState};
pub use spy::{SpyRole, SpySettings, SpyState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Charades,
    EmojiGuess,
    MemoryMatch,
    SketchGuess,
    Spy,
    Sharing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOutcome {
    Correct,
    Skip,
}

/// Whether a move left the game running or ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnFlow {
    Continue,
    Finished,
}

// ---- Countdown -----------------------------------------------------------

/// Turn/round timer stored as an absolute end-timestamp.
///
/// All comparisons take `now` from the one injected clock, so a countdown
/// never reports negative remaining time from cross-device skew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub ends_at: Option<DateTime<Utc>>,
    paused_remaining_ms: Option<i64>,
}

impl Countdown {
    pub fn idle() -> Self {
        Self {
            ends_at: None,
            paused_remaining_ms: None,
        }
    }

    pub fn start(now: DateTime<Utc>, seconds: u64) -> Self {
        Self {
            ends_at: Some(now + Duration::seconds(seconds as i64)),
            paused_remaining_ms: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ends_at.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_remaining_ms.is_some()
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.paused_remaining_ms.is_none() {
            if let Some(ends_at) = self.ends_at.take() {
                self.paused_remaining_ms = Some((ends_at - now).num_milliseconds().max(0));
            }
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(remaining) = self.paused_remaining_ms.take() {
            self.ends_at = Some(now + Duration::milliseconds(remaining));
        }
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        if let Some(remaining) = self.paused_remaining_ms {
            return remaining.max(0);
        }
        match self.ends_at {
            Some(ends_at) => (ends_at - now).num_milliseconds().max(0),
            None => 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_running() && !self.is_paused() && self.remaining_ms(now) == 0
    }
}

// ---- Team rotation -------------------------------------------------------

/// Round/team bookkeeping shared by the team games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRotation {
    /// 1-based round counter.
    pub round: u32,
    pub team_index: usize,
    pub total_rounds: u32,
    pub scores: Vec<i32>,
}

impl TeamRotation {
    pub fn new(teams: usize, total_rounds: u32) -> Self {
        Self {
            round: 1,
            team_index: 0,
            total_rounds,
            scores: vec![0; teams],
        }
    }

    pub fn teams(&self) -> usize {
        self.scores.len()
    }

    /// Add `delta` to the acting team's score. Skip deltas are configured
    /// negative, so this is always an addition.
    pub fn score(&mut self, delta: i32) {
        let team = self.team_index;
        self.scores[team] += delta;
    }

    /// Hand the turn to the next team; returns `true` once every team has
    /// acted in every round.
    pub fn advance(&mut self) -> bool {
        self.team_index += 1;
        if self.team_index == self.teams() {
            self.team_index = 0;
            self.round += 1;
        }
        self.round > self.total_rounds
    }
}

// ---- Per-game dispatch ---------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameSettings {
    Charades(CharadesSettings),
    EmojiGuess(EmojiSettings),
    MemoryMatch(MemorySettings),
    SketchGuess(SketchSettings),
    Spy(SpySettings),
    Sharing(SharingSettings),
}

impl GameSettings {
    pub fn kind(&self) -> GameKind {
        match self {
            GameSettings::Charades(_) => GameKind::Charades,
            GameSettings::EmojiGuess(_) => GameKind::EmojiGuess,
            GameSettings::MemoryMatch(_) => GameKind::MemoryMatch,
            GameSettings::SketchGuess(_) => GameKind::SketchGuess,
            GameSettings::Spy(_) => GameKind::Spy,
            GameSettings::Sharing(_) => GameKind::Sharing,
        }
    }

    pub fn default_for(kind: GameKind) -> Self {
        match kind {
            GameKind::Charades => GameSettings::Charades(CharadesSettings::default()),
            GameKind::EmojiGuess => GameSettings::EmojiGuess(EmojiSettings::default()),
            GameKind::MemoryMatch => GameSettings::MemoryMatch(MemorySettings::default()),
            GameKind::SketchGuess => GameSettings::SketchGuess(SketchSettings::default()),
            GameKind::Spy => GameSettings::Spy(SpySettings::default()),
            GameKind::Sharing => GameSettings::Sharing(SharingSettings::default()),
        }
    }

    /// Team list for team games, empty otherwise.
    pub fn teams(&self) -> &[String] {
        match self {
            GameSettings::Charades(cfg) => &cfg.teams,
            GameSettings::EmojiGuess(cfg) => &cfg.teams,
            _ => &[],
        }
    }

    pub fn min_players(&self) -> usize {
        match self {
            GameSettings::Spy(_) => 3,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameState {
    Charades(CharadesState),
    EmojiGuess(EmojiState),
    MemoryMatch(MemoryState),
    SketchGuess(SketchState),
    Spy(SpyState),
    Sharing(SharingState),
}

impl GameState {
    pub fn kind(&self) -> GameKind {
        match self {
            GameState::Charades(_) => GameKind::Charades,
            GameState::EmojiGuess(_) => GameKind::EmojiGuess,
            GameState::MemoryMatch(_) => GameKind::MemoryMatch,
            GameState::SketchGuess(_) => GameKind::SketchGuess,
            GameState::Spy(_) => GameKind::Spy,
            GameState::Sharing(_) => GameKind::Sharing,
        }
    }

    /// Build the initial state for a starting game.
    pub fn start<R: Rng>(
        settings: &GameSettings,
        players: &[Player],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<GameState, RoomError> {
        match settings {
            GameSettings::Charades(cfg) => {
                CharadesState::begin(cfg, now, rng).map(GameState::Charades)
            }
            GameSettings::EmojiGuess(cfg) => {
                EmojiState::begin(cfg, now, rng).map(GameState::EmojiGuess)
            }
            GameSettings::MemoryMatch(cfg) => {
                MemoryState::begin(cfg, players, rng).map(GameState::MemoryMatch)
            }
            GameSettings::SketchGuess(cfg) => {
                SketchState::begin(cfg, players, now, rng).map(GameState::SketchGuess)
            }
            GameSettings::Spy(cfg) => SpyState::begin(cfg, players, now, rng).map(GameState::Spy),
            GameSettings::Sharing(cfg) => {
                SharingState::begin(cfg, players, rng).map(GameState::Sharing)
            }
        }
    }

    pub fn record_score<R: Rng>(
        &mut self,
        settings: &GameSettings,
        actor: PlayerId,
        outcome: ScoreOutcome,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        match (self, settings) {
            (GameState::Charades(state), GameSettings::Charades(cfg)) => {
                state.record(cfg, outcome, rng)
            }
            (GameState::EmojiGuess(state), GameSettings::EmojiGuess(cfg)) => {
                state.record(cfg, outcome, rng)
            }
            (GameState::SketchGuess(state), GameSettings::SketchGuess(cfg)) => {
                state.record(cfg, actor, outcome, now, rng)
            }
            (state, _) if state.kind() != settings.kind() => Err(out_of_sync()),
            _ => Err(RoomError::validation("this game has no scored turns")),
        }
    }

    pub fn advance<R: Rng>(
        &mut self,
        settings: &GameSettings,
        now: DateTime<Utc>,
        reserved_speaker: Option<PlayerId>,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        match (self, settings) {
            (GameState::Charades(state), GameSettings::Charades(cfg)) => {
                state.advance(cfg, now, rng)
            }
            (GameState::EmojiGuess(state), GameSettings::EmojiGuess(cfg)) => {
                state.advance(cfg, now, rng)
            }
            (GameState::SketchGuess(state), GameSettings::SketchGuess(cfg)) => {
                state.advance(cfg, now, rng)
            }
            (GameState::Sharing(state), GameSettings::Sharing(_)) => {
                Ok(state.advance(reserved_speaker))
            }
            (state, _) if state.kind() != settings.kind() => Err(out_of_sync()),
            (GameState::MemoryMatch(_), _) => Err(RoomError::validation(
                "memory match advances through card flips",
            )),
            _ => Err(RoomError::validation("this game has no turn rotation")),
        }
    }

    pub fn flip_card(&mut self, actor: PlayerId, card: usize) -> Result<TurnFlow, RoomError> {
        match self {
            GameState::MemoryMatch(state) => state.flip(actor, card),
            _ => Err(RoomError::validation(
                "card flips only apply to memory match",
            )),
        }
    }

    pub fn reveal(&mut self) -> Result<TurnFlow, RoomError> {
        match self {
            GameState::Spy(state) => {
                state.reveal();
                Ok(TurnFlow::Finished)
            }
            _ => Err(RoomError::validation("reveal only applies to the spy game")),
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), RoomError> {
        match self.countdown_mut() {
            Some(countdown) => {
                countdown.pause(now);
                Ok(())
            }
            None => Err(RoomError::validation("this game has no timer to pause")),
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), RoomError> {
        match self.countdown_mut() {
            Some(countdown) => {
                countdown.resume(now);
                Ok(())
            }
            None => Err(RoomError::validation("this game has no timer to resume")),
        }
    }

    /// Drop a departed player from any per-player rotation the game keeps.
    /// Returns `TurnFlow::Finished` when the game cannot continue without
    /// them.
    pub fn handle_leave(&mut self, player: PlayerId) -> TurnFlow {
        match self {
            GameState::Charades(_) | GameState::EmojiGuess(_) => TurnFlow::Continue,
            GameState::MemoryMatch(state) => state.remove_player(player),
            GameState::SketchGuess(state) => state.remove_player(player),
            GameState::Sharing(state) => state.remove_player(player),
            GameState::Spy(state) => {
                if state.spy == player {
                    state.reveal();
                    TurnFlow::Finished
                } else {
                    TurnFlow::Continue
                }
            }
        }
    }

    fn countdown_mut(&mut self) -> Option<&mut Countdown> {
        match self {
            GameState::Charades(state) => Some(&mut state.turn),
            GameState::EmojiGuess(state) => Some(&mut state.turn),
            GameState::SketchGuess(state) => Some(&mut state.turn),
            GameState::Spy(state) => Some(&mut state.discussion),
            GameState::MemoryMatch(_) | GameState::Sharing(_) => None,
        }
    }
}

fn out_of_sync() -> RoomError {
    RoomError::storage("game state out of sync with settings")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_pause_preserves_remaining_time() {
        let start = Utc::now();
        let mut countdown = Countdown::start(start, 60);

        let later = start + Duration::seconds(20);
        countdown.pause(later);
        assert!(countdown.is_paused());
        assert_eq!(countdown.remaining_ms(later), 40_000);

        // Time passing while paused changes nothing.
        let much_later = later + Duration::seconds(500);
        assert_eq!(countdown.remaining_ms(much_later), 40_000);

        countdown.resume(much_later);
        assert!(!countdown.is_paused());
        assert_eq!(countdown.remaining_ms(much_later), 40_000);
        assert!(countdown.is_expired(much_later + Duration::seconds(41)));
    }

    #[test]
    fn countdown_never_goes_negative() {
        let start = Utc::now();
        let countdown = Countdown::start(start, 1);
        assert_eq!(countdown.remaining_ms(start + Duration::seconds(30)), 0);
    }

    #[test]
    fn rotation_finishes_after_rounds_times_teams_advances() {
        let mut rotation = TeamRotation::new(2, 2);
        assert_eq!(rotation.round, 1);
        assert_eq!(rotation.team_index, 0);

        let mut finishes = Vec::new();
        for _ in 0..4 {
            finishes.push(rotation.advance());
        }
        assert_eq!(finishes, vec![false, false, false, true]);
    }

    #[test]
    fn rotation_scores_the_acting_team() {
        let mut rotation = TeamRotation::new(3, 1);
        rotation.score(3);
        rotation.advance();
        rotation.score(-1);
        assert_eq!(rotation.scores, vec![3, -1, 0]);
    }
}
